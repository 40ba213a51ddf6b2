use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::payment_proof_submissions;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_proof_submissions)]
pub struct PaymentProofEntity {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub claimed_amount: Decimal,
    pub image_ref: String,
    pub extracted_fields: Option<serde_json::Value>,
    pub checks: Option<serde_json::Value>,
    pub confidence: Option<i32>,
    pub verification_status: String,
    pub review_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_proof_submissions)]
pub struct InsertPaymentProofEntity {
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub claimed_amount: Decimal,
    pub image_ref: String,
    pub verification_status: String,
    pub submitted_at: DateTime<Utc>,
}
