use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    domain::value_objects::proof_submissions::{NewProofSubmission, ProofSubmissionDto},
    infrastructure::{
        axum_http::error_responses::error_response, billing_services::ProofService,
    },
};

pub fn routes(proofs: Arc<ProofService>) -> Router {
    Router::new()
        .route("/", post(submit_proof))
        .route("/:submission_id/verify", post(verify_proof))
        .route("/:submission_id/approve", post(approve_proof))
        .route("/:submission_id/reject", post(reject_proof))
        .with_state(proofs)
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    note: Option<String>,
}

async fn submit_proof(
    State(proofs): State<Arc<ProofService>>,
    Json(submission): Json<NewProofSubmission>,
) -> Response {
    match proofs.submit(submission, Utc::now()).await {
        Ok(entity) => (
            StatusCode::CREATED,
            Json(ProofSubmissionDto::from(entity)),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn verify_proof(
    State(proofs): State<Arc<ProofService>>,
    Path(submission_id): Path<Uuid>,
) -> Response {
    match proofs.verify_submission(submission_id, Utc::now()).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn approve_proof(
    State(proofs): State<Arc<ProofService>>,
    Path(submission_id): Path<Uuid>,
    Json(body): Json<ReviewBody>,
) -> Response {
    match proofs
        .approve_submission(submission_id, body.note, Utc::now())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn reject_proof(
    State(proofs): State<Arc<ProofService>>,
    Path(submission_id): Path<Uuid>,
    Json(body): Json<ReviewBody>,
) -> Response {
    match proofs
        .reject_submission(submission_id, body.note, Utc::now())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(&err),
    }
}
