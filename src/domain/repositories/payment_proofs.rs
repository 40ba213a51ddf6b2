use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payment_proofs::{InsertPaymentProofEntity, PaymentProofEntity},
    value_objects::{
        enums::verification_statuses::VerificationStatus, proof_submissions::ProofResolution,
    },
};

#[async_trait]
#[automock]
pub trait PaymentProofRepository {
    async fn create_submission(
        &self,
        submission: InsertPaymentProofEntity,
    ) -> Result<PaymentProofEntity>;

    async fn find_by_id(&self, submission_id: Uuid) -> Result<Option<PaymentProofEntity>>;

    /// Compare-and-set resolution: applies only while the submission is
    /// still in `expected_current`, so a submission resolves exactly once.
    async fn resolve(
        &self,
        submission_id: Uuid,
        expected_current: VerificationStatus,
        resolution: ProofResolution,
    ) -> Result<bool>;
}
