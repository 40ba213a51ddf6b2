use std::fmt::Display;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::invoices::InvoiceRunSummary;

/// Outcome of one daily sweep. Stage errors are collected rather than
/// aborting the sweep; a re-run picks up whatever a failed stage missed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub overdue_marked: u64,
    pub suspended: u64,
    pub cancelled: u64,
    pub invoices: InvoiceRunSummary,
    pub billing_dates_advanced: u32,
    pub stage_errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactivationPath {
    Standard,
    Enhanced,
}

impl ReactivationPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactivationPath::Standard => "standard",
            ReactivationPath::Enhanced => "enhanced",
        }
    }
}

impl Display for ReactivationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactivationOutcome {
    pub subscription_id: Uuid,
    pub path: ReactivationPath,
    pub invoice_id: Option<Uuid>,
    pub archived_invoices: u64,
    pub collection_jobs_cancelled: u64,
}
