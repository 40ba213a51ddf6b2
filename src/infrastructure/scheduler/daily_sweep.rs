use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    application::errors::BillingError,
    infrastructure::billing_services::{LateFeeService, LifecycleService},
};

/// Background task driving the daily lifecycle sweep and the late-fee
/// run. Every stage underneath is idempotent, so a crashed or doubled
/// tick is harmless.
pub async fn run_scheduler_loop(
    lifecycle: Arc<LifecycleService>,
    late_fees: Arc<LateFeeService>,
    interval: Duration,
) {
    info!(interval_secs = interval.as_secs(), "scheduler: loop started");

    loop {
        run_tick(&lifecycle, &late_fees).await;
        tokio::time::sleep(interval).await;
    }
}

async fn run_tick(lifecycle: &LifecycleService, late_fees: &LateFeeService) {
    let now = Utc::now();

    match lifecycle.run_daily_sweep(now).await {
        Ok(summary) => {
            info!(
                overdue_marked = summary.overdue_marked,
                suspended = summary.suspended,
                cancelled = summary.cancelled,
                invoices_generated = summary.invoices.generated,
                billing_dates_advanced = summary.billing_dates_advanced,
                stage_errors = summary.stage_errors.len(),
                "scheduler: lifecycle sweep completed"
            );
        }
        Err(BillingError::Conflict(reason)) => {
            warn!(%reason, "scheduler: lifecycle sweep skipped");
        }
        Err(err) => {
            error!(error = ?err, "scheduler: lifecycle sweep failed");
        }
    }

    match late_fees.process_late_fees(now).await {
        Ok(summary) => {
            info!(
                processed_count = summary.processed_count,
                total_fees_applied = %summary.total_fees_applied,
                "scheduler: late-fee run completed"
            );
        }
        Err(err) => {
            error!(error = ?err, "scheduler: late-fee run failed");
        }
    }
}
