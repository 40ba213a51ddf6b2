use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::invoices;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = invoices)]
pub struct InvoiceEntity {
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
    pub generated_date: NaiveDate,
    pub late_fee_applied: bool,
    pub late_fee_amount: Decimal,
    pub archived: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invoices)]
pub struct InsertInvoiceEntity {
    pub invoice_number: String,
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub invoice_type: String,
    pub original_amount: Decimal,
    pub credit_applied: Decimal,
    pub amount: Decimal,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub generated_date: NaiveDate,
    pub late_fee_applied: bool,
    pub late_fee_amount: Decimal,
    pub archived: bool,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
