use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle of a payment-proof submission. `Pending` and `NeedsReview`
/// are the only states a resolution may start from; everything else is
/// terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    NeedsReview,
    AutoVerified,
    Verified,
    AutoRejected,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::NeedsReview => "needs_review",
            VerificationStatus::AutoVerified => "auto_verified",
            VerificationStatus::Verified => "verified",
            VerificationStatus::AutoRejected => "auto_rejected",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(VerificationStatus::Pending),
            "needs_review" => Some(VerificationStatus::NeedsReview),
            "auto_verified" => Some(VerificationStatus::AutoVerified),
            "verified" => Some(VerificationStatus::Verified),
            "auto_rejected" => Some(VerificationStatus::AutoRejected),
            "rejected" => Some(VerificationStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            VerificationStatus::Pending | VerificationStatus::NeedsReview
        )
    }
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
