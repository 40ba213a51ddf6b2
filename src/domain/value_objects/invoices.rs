use chrono::{DateTime, NaiveDate, Utc};
use rand::{Rng, distributions::Alphanumeric};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::invoices::InvoiceEntity, value_objects::enums::invoice_types::InvoiceType,
};

/// Caller-facing request for a single invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceRequest {
    pub subscription_id: Uuid,
    pub base_amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub invoice_type: InvoiceType,
    pub notes: Option<String>,
}

/// Fully resolved insert minus the credit split, which the storage layer
/// computes inside the same transaction as the insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub invoice_type: InvoiceType,
    pub base_amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub generated_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceRunSummary {
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDto {
    pub id: Uuid,
    pub invoice_number: String,
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub invoice_type: String,
    pub original_amount: Decimal,
    pub credit_applied: Decimal,
    pub amount: Decimal,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub late_fee_applied: bool,
    pub late_fee_amount: Decimal,
}

impl From<InvoiceEntity> for InvoiceDto {
    fn from(entity: InvoiceEntity) -> Self {
        Self {
            id: entity.id,
            invoice_number: entity.invoice_number,
            subscription_id: entity.subscription_id,
            customer_id: entity.customer_id,
            invoice_type: entity.invoice_type,
            original_amount: entity.original_amount,
            credit_applied: entity.credit_applied,
            amount: entity.amount,
            status: entity.status,
            due_date: entity.due_date,
            late_fee_applied: entity.late_fee_applied,
            late_fee_amount: entity.late_fee_amount,
        }
    }
}

/// Globally unique, human-scannable invoice number. The date prefix keeps
/// numbers sortable; the random suffix keeps concurrent generators apart.
pub fn next_invoice_number(today: NaiveDate) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|byte| (byte as char).to_ascii_uppercase())
        .collect();

    format!("INV-{}-{}", today.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_numbers_carry_date_prefix_and_differ() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

        let first = next_invoice_number(today);
        let second = next_invoice_number(today);

        assert!(first.starts_with("INV-20260115-"));
        assert_eq!(first.len(), "INV-20260115-".len() + 6);
        assert_ne!(first, second);
    }
}
