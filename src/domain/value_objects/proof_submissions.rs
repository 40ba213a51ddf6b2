use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payment_proofs::PaymentProofEntity,
    value_objects::{
        enums::verification_statuses::VerificationStatus, payment_proofs::VerificationReport,
    },
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewProofSubmission {
    pub subscription_id: Uuid,
    pub claimed_amount: Decimal,
    pub image_ref: String,
}

/// Terminal write applied to a submission exactly once.
#[derive(Debug, Clone)]
pub struct ProofResolution {
    pub status: VerificationStatus,
    pub confidence: Option<i32>,
    pub extracted_fields: Option<serde_json::Value>,
    pub checks: Option<serde_json::Value>,
    pub review_note: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

/// What one verification (or adjudication) call did to a submission.
#[derive(Debug, Clone, Serialize)]
pub struct ProofVerificationOutcome {
    pub submission_id: Uuid,
    pub status: VerificationStatus,
    pub confidence: Option<i32>,
    pub payment_id: Option<Uuid>,
    pub report: Option<VerificationReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofSubmissionDto {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub customer_id: Uuid,
    pub claimed_amount: Decimal,
    pub verification_status: String,
    pub confidence: Option<i32>,
    pub review_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<PaymentProofEntity> for ProofSubmissionDto {
    fn from(entity: PaymentProofEntity) -> Self {
        Self {
            id: entity.id,
            subscription_id: entity.subscription_id,
            customer_id: entity.customer_id,
            claimed_amount: entity.claimed_amount,
            verification_status: entity.verification_status,
            confidence: entity.confidence,
            review_note: entity.review_note,
            submitted_at: entity.submitted_at,
            resolved_at: entity.resolved_at,
        }
    }
}
