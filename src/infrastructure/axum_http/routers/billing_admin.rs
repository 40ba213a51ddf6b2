use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::value_objects::invoices::{CreateInvoiceRequest, InvoiceDto},
    infrastructure::{
        axum_http::error_responses::error_response,
        billing_services::{InvoiceGenService, LateFeeService, LedgerService, LifecycleService},
    },
};

/// Administrative trigger surface. Every handler delegates to the same
/// use-case instance the scheduler drives, so a manual invocation is
/// semantically identical to a scheduled one.
#[derive(Clone)]
pub struct BillingAdminState {
    pub lifecycle: Arc<LifecycleService>,
    pub late_fees: Arc<LateFeeService>,
    pub ledger: Arc<LedgerService>,
    pub invoice_gen: Arc<InvoiceGenService>,
}

pub fn routes(state: BillingAdminState) -> Router {
    Router::new()
        .route("/lifecycle/run", post(run_lifecycle_sweep))
        .route("/late-fees/run", post(run_late_fee_sweep))
        .route(
            "/subscriptions/:subscription_id/reactivate",
            post(reactivate_subscription),
        )
        .route("/invoices", post(create_invoice))
        .route("/customers/:customer_id/balance", get(customer_balance))
        .route(
            "/invoices/:invoice_id/late-fee-eligibility",
            get(late_fee_eligibility),
        )
        .with_state(state)
}

async fn create_invoice(
    State(state): State<BillingAdminState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Response {
    match state.invoice_gen.create_invoice(request, Utc::now()).await {
        Ok(invoice) => (StatusCode::CREATED, Json(InvoiceDto::from(invoice))).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn run_lifecycle_sweep(State(state): State<BillingAdminState>) -> Response {
    match state.lifecycle.run_daily_sweep(Utc::now()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn run_late_fee_sweep(State(state): State<BillingAdminState>) -> Response {
    match state.late_fees.process_late_fees(Utc::now()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn reactivate_subscription(
    State(state): State<BillingAdminState>,
    Path(subscription_id): Path<Uuid>,
) -> Response {
    match state.lifecycle.reactivate(subscription_id, Utc::now()).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn customer_balance(
    State(state): State<BillingAdminState>,
    Path(customer_id): Path<Uuid>,
) -> Response {
    match state.ledger.compute_balance(customer_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn late_fee_eligibility(
    State(state): State<BillingAdminState>,
    Path(invoice_id): Path<Uuid>,
) -> Response {
    match state.late_fees.late_fee_eligibility(invoice_id, Utc::now()).await {
        Ok(eligibility) => (StatusCode::OK, Json(eligibility)).into_response(),
        Err(err) => error_response(&err),
    }
}
