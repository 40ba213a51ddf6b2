use std::fmt::Display;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

/// Outbound customer notifications. Fire-and-forget from the core's
/// perspective; a failed send must never roll back the billing mutation
/// it follows.
#[async_trait]
#[automock]
pub trait BillingNotifier: Send + Sync {
    async fn notify(
        &self,
        customer_id: Uuid,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    LateFeeApplied,
    SubscriptionSuspended,
    SubscriptionCancelled,
    SubscriptionReactivated,
    PaymentVerified,
    ProofNeedsReview,
    ProofRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::LateFeeApplied => "late_fee_applied",
            NotificationKind::SubscriptionSuspended => "subscription_suspended",
            NotificationKind::SubscriptionCancelled => "subscription_cancelled",
            NotificationKind::SubscriptionReactivated => "subscription_reactivated",
            NotificationKind::PaymentVerified => "payment_verified",
            NotificationKind::ProofNeedsReview => "proof_needs_review",
            NotificationKind::ProofRejected => "proof_rejected",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
