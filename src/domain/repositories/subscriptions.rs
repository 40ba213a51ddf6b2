use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;

/// Every mutation re-checks its precondition inside the SQL predicate, so
/// a racing caller no-ops (affected-row count zero) instead of applying a
/// duplicate effect.
#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    /// Active subscriptions on a monthly plan whose billing start has
    /// elapsed as of `today`.
    async fn list_billable_monthly(&self, today: NaiveDate) -> Result<Vec<SubscriptionEntity>>;

    /// Active subscriptions whose next billing date is due as of `today`.
    async fn list_due_for_advance(&self, today: NaiveDate) -> Result<Vec<SubscriptionEntity>>;

    /// active → suspended for every subscription whose grace period has
    /// ended; returns the affected rows.
    async fn suspend_past_grace(&self, now: DateTime<Utc>) -> Result<Vec<SubscriptionEntity>>;

    /// suspended → cancelled for every subscription suspended before
    /// `cutoff`; returns the affected rows.
    async fn cancel_suspended_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>>;

    /// Compare-and-set advance of one subscription's billing date.
    async fn advance_billing_date(
        &self,
        subscription_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<bool>;

    /// Marks the current cycle as awaiting payment and stamps the grace
    /// period deadline after an invoice has been issued.
    async fn begin_pending_cycle(
        &self,
        subscription_id: Uuid,
        grace_period_end: DateTime<Utc>,
    ) -> Result<bool>;

    /// Applies a confirmed payment: payment_status → paid and, from
    /// pending_payment, status → active.
    async fn mark_payment_received(&self, subscription_id: Uuid) -> Result<bool>;

    /// suspended|cancelled → pending_payment with a fresh lifecycle:
    /// reactivated_at stamped, billing dates reset, suspension and
    /// cancellation timestamps cleared.
    async fn reactivate(
        &self,
        subscription_id: Uuid,
        now: DateTime<Utc>,
        billing_start_date: NaiveDate,
        next_billing_date: NaiveDate,
    ) -> Result<bool>;
}
