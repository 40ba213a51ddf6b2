use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{AsChangeset, OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::payment_proofs::{InsertPaymentProofEntity, PaymentProofEntity},
        repositories::payment_proofs::PaymentProofRepository,
        value_objects::{
            enums::verification_statuses::VerificationStatus,
            proof_submissions::ProofResolution,
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad, schema::payment_proof_submissions,
    },
};

/// `None` fields are left untouched, so a manual resolution keeps the
/// extraction artifacts captured earlier.
#[derive(AsChangeset)]
#[diesel(table_name = payment_proof_submissions)]
struct ResolutionChangeset {
    verification_status: String,
    confidence: Option<i32>,
    extracted_fields: Option<serde_json::Value>,
    checks: Option<serde_json::Value>,
    review_note: Option<String>,
    resolved_at: DateTime<Utc>,
}

pub struct PaymentProofPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentProofPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentProofRepository for PaymentProofPostgres {
    async fn create_submission(
        &self,
        submission: InsertPaymentProofEntity,
    ) -> Result<PaymentProofEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = insert_into(payment_proof_submissions::table)
            .values(&submission)
            .returning(PaymentProofEntity::as_returning())
            .get_result(&mut conn)?;

        Ok(row)
    }

    async fn find_by_id(&self, submission_id: Uuid) -> Result<Option<PaymentProofEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = payment_proof_submissions::table
            .filter(payment_proof_submissions::id.eq(submission_id))
            .first::<PaymentProofEntity>(&mut conn)
            .optional()?;

        Ok(row)
    }

    async fn resolve(
        &self,
        submission_id: Uuid,
        expected_current: VerificationStatus,
        resolution: ProofResolution,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(
            payment_proof_submissions::table
                .filter(payment_proof_submissions::id.eq(submission_id))
                .filter(
                    payment_proof_submissions::verification_status
                        .eq(expected_current.as_str()),
                ),
        )
        .set(&ResolutionChangeset {
            verification_status: resolution.status.as_str().to_string(),
            confidence: resolution.confidence,
            extracted_fields: resolution.extracted_fields,
            checks: resolution.checks,
            review_note: resolution.review_note,
            resolved_at: resolution.resolved_at,
        })
        .execute(&mut conn)?;

        Ok(updated > 0)
    }
}
