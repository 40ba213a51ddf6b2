use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payments::{InsertPaymentEntity, PaymentEntity};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    async fn record_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity>;

    /// Payments linked to the customer through non-archived invoices, the
    /// credit side of the ledger.
    async fn list_active_by_customer(&self, customer_id: Uuid) -> Result<Vec<PaymentEntity>>;
}
