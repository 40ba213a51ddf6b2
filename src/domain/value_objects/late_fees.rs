use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LateFeeRunSummary {
    pub processed_count: u32,
    pub total_fees_applied: Decimal,
}

impl Default for LateFeeRunSummary {
    fn default() -> Self {
        Self {
            processed_count: 0,
            total_fees_applied: Decimal::ZERO,
        }
    }
}

/// Administrative read answering "would this invoice get a fee, and why
/// or why not".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LateFeeEligibility {
    pub eligible: bool,
    pub reason: String,
    pub days_overdue: Option<i64>,
    pub days_until_eligible: Option<i64>,
}
