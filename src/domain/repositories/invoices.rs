use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    entities::invoices::InvoiceEntity,
    value_objects::{enums::invoice_statuses::InvoiceStatus, invoices::InvoiceDraft},
};

#[async_trait]
#[automock]
pub trait InvoiceRepository {
    async fn find_by_id(&self, invoice_id: Uuid) -> Result<Option<InvoiceEntity>>;

    /// Non-archived invoices for the customer, the debit side of the
    /// ledger.
    async fn list_active_by_customer(&self, customer_id: Uuid) -> Result<Vec<InvoiceEntity>>;

    /// Persists the draft, computing the credit split from the customer's
    /// balance inside the same serializable transaction so two concurrent
    /// creations cannot both consume the same credit.
    async fn create_credit_aware(&self, draft: InvoiceDraft) -> Result<InvoiceEntity>;

    /// As `create_credit_aware`, but re-checks the cycle guards (no open
    /// invoice, none generated today) inside the transaction and returns
    /// `None` when a guard trips.
    async fn create_cycle_guarded(&self, draft: InvoiceDraft) -> Result<Option<InvoiceEntity>>;

    /// An unpaid/partially-paid/overdue invoice for the subscription, if
    /// any.
    async fn find_open_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<InvoiceEntity>>;

    async fn has_open_for_subscription(&self, subscription_id: Uuid) -> Result<bool>;

    async fn has_invoice_generated_on(
        &self,
        subscription_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool>;

    /// Subscription invoices still owing whose due date is before
    /// `due_before` and which carry no late fee yet.
    async fn list_late_fee_candidates(
        &self,
        due_before: DateTime<Utc>,
    ) -> Result<Vec<InvoiceEntity>>;

    /// Compare-and-set fee application: flips `late_fee_applied`, adds the
    /// fee to the amount and appends the audit note, only if no fee has
    /// been applied yet.
    async fn apply_late_fee(&self, invoice_id: Uuid, fee: Decimal, note: &str) -> Result<bool>;

    /// unpaid → overdue for every invoice past its due date; returns the
    /// number of rows flipped.
    async fn mark_overdue_past_due(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Settles an open invoice as paid or partially paid.
    async fn mark_settled(
        &self,
        invoice_id: Uuid,
        status: InvoiceStatus,
        paid_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Flags still-owing invoices of a subscription as archived; rows are
    /// kept for audit but leave the ledger.
    async fn archive_unpaid_for_subscription(&self, subscription_id: Uuid) -> Result<u64>;
}
