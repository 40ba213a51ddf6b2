use std::{sync::Arc, time::Duration};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        errors::{BillingError, BillingResult},
        notifier::{BillingNotifier, NotificationKind},
    },
    domain::{
        entities::{
            invoices::InvoiceEntity,
            payment_proofs::{InsertPaymentProofEntity, PaymentProofEntity},
            payments::InsertPaymentEntity,
        },
        repositories::{
            invoices::InvoiceRepository, payment_proofs::PaymentProofRepository,
            payments::PaymentRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::{
                invoice_statuses::InvoiceStatus, verification_statuses::VerificationStatus,
            },
            payment_proofs::{
                evaluate_proof, ExtractedFields, VerificationReport, WalletProofPolicy,
            },
            proof_submissions::{NewProofSubmission, ProofResolution, ProofVerificationOutcome},
        },
    },
};

pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 20;

const PAYMENT_METHOD: &str = "mobile_wallet";

/// Text-extraction collaborator. The engine only interprets the returned
/// text; extraction itself (and its latency) stays outside.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image_ref: &str) -> AnyResult<String>;
}

/// Scores submitted payment proofs and resolves each submission exactly
/// once. Extraction failures and timeouts park the submission for human
/// review instead of erroring: an adjudicator must always be reachable.
pub struct ProofVerificationUseCase<Pr, I, P, S, E, N>
where
    Pr: PaymentProofRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    E: TextExtractor + 'static,
    N: BillingNotifier + Send + Sync + 'static,
{
    proof_repo: Arc<Pr>,
    invoice_repo: Arc<I>,
    payment_repo: Arc<P>,
    subscription_repo: Arc<S>,
    extractor: Arc<E>,
    notifier: Arc<N>,
    policy: WalletProofPolicy,
    extraction_timeout: Duration,
}

impl<Pr, I, P, S, E, N> ProofVerificationUseCase<Pr, I, P, S, E, N>
where
    Pr: PaymentProofRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    E: TextExtractor + 'static,
    N: BillingNotifier + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        proof_repo: Arc<Pr>,
        invoice_repo: Arc<I>,
        payment_repo: Arc<P>,
        subscription_repo: Arc<S>,
        extractor: Arc<E>,
        notifier: Arc<N>,
        policy: WalletProofPolicy,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            proof_repo,
            invoice_repo,
            payment_repo,
            subscription_repo,
            extractor,
            notifier,
            policy,
            extraction_timeout,
        }
    }

    pub async fn submit(
        &self,
        submission: NewProofSubmission,
        now: DateTime<Utc>,
    ) -> BillingResult<PaymentProofEntity> {
        if submission.claimed_amount <= Decimal::ZERO {
            return Err(BillingError::Validation(format!(
                "claimed amount must be positive, got {}",
                submission.claimed_amount
            )));
        }
        if submission.image_ref.trim().is_empty() {
            return Err(BillingError::Validation(
                "image reference must not be empty".to_string(),
            ));
        }

        let subscription = self
            .subscription_repo
            .find_by_id(submission.subscription_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| BillingError::not_found("subscription", submission.subscription_id))?;

        let entity = self
            .proof_repo
            .create_submission(InsertPaymentProofEntity {
                subscription_id: subscription.id,
                customer_id: subscription.customer_id,
                claimed_amount: submission.claimed_amount,
                image_ref: submission.image_ref,
                verification_status: VerificationStatus::Pending.as_str().to_string(),
                submitted_at: now,
            })
            .await
            .map_err(BillingError::Internal)?;

        info!(
            submission_id = %entity.id,
            subscription_id = %subscription.id,
            claimed_amount = %entity.claimed_amount,
            "proof_verification: submission received"
        );

        Ok(entity)
    }

    /// Pure scoring of already-extracted text; identical inputs always
    /// yield identical reports.
    pub fn evaluate_text(&self, text: &str, expected_amount: Decimal) -> VerificationReport {
        evaluate_proof(text, expected_amount, &self.policy)
    }

    pub async fn verify_submission(
        &self,
        submission_id: Uuid,
        now: DateTime<Utc>,
    ) -> BillingResult<ProofVerificationOutcome> {
        let submission = self
            .proof_repo
            .find_by_id(submission_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| BillingError::not_found("payment proof submission", submission_id))?;

        let current = self.current_status(&submission)?;
        if current != VerificationStatus::Pending {
            return Err(BillingError::Conflict(format!(
                "submission has already been resolved to {current}"
            )));
        }

        let open_invoice = self
            .invoice_repo
            .find_open_for_subscription(submission.subscription_id)
            .await
            .map_err(BillingError::Internal)?;
        let expected_amount = open_invoice
            .as_ref()
            .map(|invoice| invoice.amount)
            .unwrap_or(submission.claimed_amount);

        let text = match self.extract_with_timeout(&submission.image_ref).await {
            Ok(text) => text,
            Err(err @ BillingError::ExternalService(_)) => {
                warn!(
                    submission_id = %submission.id,
                    error = %err,
                    "proof_verification: extraction failed, parking for review"
                );
                return self
                    .park_for_review(&submission, None, format!("{err}"), now)
                    .await;
            }
            Err(err) => return Err(err),
        };

        let report = evaluate_proof(&text, expected_amount, &self.policy);

        let mut status = VerificationStatus::from(report.decision);
        let mut review_note = None;
        if status == VerificationStatus::AutoVerified && open_invoice.is_none() {
            // Nothing to settle the payment against; a human decides.
            status = VerificationStatus::NeedsReview;
            review_note = Some("no open invoice to apply payment to".to_string());
        }

        let resolved = self
            .proof_repo
            .resolve(
                submission.id,
                VerificationStatus::Pending,
                ProofResolution {
                    status,
                    confidence: Some(report.confidence),
                    extracted_fields: serde_json::to_value(&report.fields).ok(),
                    checks: serde_json::to_value(&report.checks).ok(),
                    review_note: review_note.clone(),
                    resolved_at: now,
                },
            )
            .await
            .map_err(BillingError::Internal)?;
        if !resolved {
            return Err(BillingError::Conflict(
                "submission was resolved concurrently".to_string(),
            ));
        }

        let mut payment_id = None;
        if status == VerificationStatus::AutoVerified {
            if let Some(invoice) = open_invoice {
                payment_id = Some(self.apply_payment(&submission, &report, &invoice, now).await?);
            }
        }

        self.notify_outcome(&submission, status).await;

        info!(
            submission_id = %submission.id,
            status = %status,
            confidence = report.confidence,
            is_valid = report.is_valid,
            "proof_verification: submission resolved"
        );

        Ok(ProofVerificationOutcome {
            submission_id: submission.id,
            status,
            confidence: Some(report.confidence),
            payment_id,
            report: Some(report),
        })
    }

    /// Human adjudication of a parked (or still pending) submission.
    pub async fn approve_submission(
        &self,
        submission_id: Uuid,
        review_note: Option<String>,
        now: DateTime<Utc>,
    ) -> BillingResult<ProofVerificationOutcome> {
        let submission = self
            .proof_repo
            .find_by_id(submission_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| BillingError::not_found("payment proof submission", submission_id))?;

        let current = self.current_status(&submission)?;
        if current.is_terminal() {
            return Err(BillingError::Conflict(format!(
                "submission has already been resolved to {current}"
            )));
        }

        let invoice = self
            .invoice_repo
            .find_open_for_subscription(submission.subscription_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| {
                BillingError::Conflict("no open invoice to apply payment to".to_string())
            })?;

        let resolved = self
            .proof_repo
            .resolve(
                submission.id,
                current,
                ProofResolution {
                    status: VerificationStatus::Verified,
                    confidence: submission.confidence,
                    extracted_fields: None,
                    checks: None,
                    review_note,
                    resolved_at: now,
                },
            )
            .await
            .map_err(BillingError::Internal)?;
        if !resolved {
            return Err(BillingError::Conflict(
                "submission was resolved concurrently".to_string(),
            ));
        }

        let reference = submission
            .extracted_fields
            .clone()
            .and_then(|value| serde_json::from_value::<ExtractedFields>(value).ok())
            .and_then(|fields| fields.reference_number);

        let payment = self
            .payment_repo
            .record_payment(InsertPaymentEntity {
                invoice_id: invoice.id,
                customer_id: submission.customer_id,
                amount: submission.claimed_amount,
                method: PAYMENT_METHOD.to_string(),
                reference,
                paid_at: now,
            })
            .await
            .map_err(BillingError::Internal)?;

        self.settle_invoice(&invoice, submission.claimed_amount, submission.subscription_id, now)
            .await?;
        self.notify_outcome(&submission, VerificationStatus::Verified)
            .await;

        info!(
            submission_id = %submission.id,
            payment_id = %payment.id,
            "proof_verification: submission approved by reviewer"
        );

        Ok(ProofVerificationOutcome {
            submission_id: submission.id,
            status: VerificationStatus::Verified,
            confidence: submission.confidence,
            payment_id: Some(payment.id),
            report: None,
        })
    }

    pub async fn reject_submission(
        &self,
        submission_id: Uuid,
        review_note: Option<String>,
        now: DateTime<Utc>,
    ) -> BillingResult<ProofVerificationOutcome> {
        let submission = self
            .proof_repo
            .find_by_id(submission_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| BillingError::not_found("payment proof submission", submission_id))?;

        let current = self.current_status(&submission)?;
        if current.is_terminal() {
            return Err(BillingError::Conflict(format!(
                "submission has already been resolved to {current}"
            )));
        }

        let resolved = self
            .proof_repo
            .resolve(
                submission.id,
                current,
                ProofResolution {
                    status: VerificationStatus::Rejected,
                    confidence: submission.confidence,
                    extracted_fields: None,
                    checks: None,
                    review_note,
                    resolved_at: now,
                },
            )
            .await
            .map_err(BillingError::Internal)?;
        if !resolved {
            return Err(BillingError::Conflict(
                "submission was resolved concurrently".to_string(),
            ));
        }

        self.notify_outcome(&submission, VerificationStatus::Rejected)
            .await;

        info!(
            submission_id = %submission.id,
            "proof_verification: submission rejected by reviewer"
        );

        Ok(ProofVerificationOutcome {
            submission_id: submission.id,
            status: VerificationStatus::Rejected,
            confidence: submission.confidence,
            payment_id: None,
            report: None,
        })
    }

    fn current_status(&self, submission: &PaymentProofEntity) -> BillingResult<VerificationStatus> {
        VerificationStatus::from_str(&submission.verification_status).ok_or_else(|| {
            BillingError::DataIntegrity(format!(
                "submission {} has unknown verification status {:?}",
                submission.id, submission.verification_status
            ))
        })
    }

    async fn extract_with_timeout(&self, image_ref: &str) -> BillingResult<String> {
        match tokio::time::timeout(self.extraction_timeout, self.extractor.extract_text(image_ref))
            .await
        {
            Err(_) => Err(BillingError::ExternalService(format!(
                "text extraction timed out after {:?}",
                self.extraction_timeout
            ))),
            Ok(Err(err)) => Err(BillingError::ExternalService(format!(
                "text extraction failed: {err}"
            ))),
            Ok(Ok(text)) => Ok(text),
        }
    }

    async fn park_for_review(
        &self,
        submission: &PaymentProofEntity,
        report: Option<&VerificationReport>,
        note: String,
        now: DateTime<Utc>,
    ) -> BillingResult<ProofVerificationOutcome> {
        let resolved = self
            .proof_repo
            .resolve(
                submission.id,
                VerificationStatus::Pending,
                ProofResolution {
                    status: VerificationStatus::NeedsReview,
                    confidence: report.map(|r| r.confidence),
                    extracted_fields: report.and_then(|r| serde_json::to_value(&r.fields).ok()),
                    checks: report.and_then(|r| serde_json::to_value(&r.checks).ok()),
                    review_note: Some(note),
                    resolved_at: now,
                },
            )
            .await
            .map_err(BillingError::Internal)?;
        if !resolved {
            return Err(BillingError::Conflict(
                "submission was resolved concurrently".to_string(),
            ));
        }

        self.notify_outcome(submission, VerificationStatus::NeedsReview)
            .await;

        Ok(ProofVerificationOutcome {
            submission_id: submission.id,
            status: VerificationStatus::NeedsReview,
            confidence: report.map(|r| r.confidence),
            payment_id: None,
            report: report.cloned(),
        })
    }

    async fn apply_payment(
        &self,
        submission: &PaymentProofEntity,
        report: &VerificationReport,
        invoice: &InvoiceEntity,
        now: DateTime<Utc>,
    ) -> BillingResult<Uuid> {
        let amount = report
            .fields
            .amounts
            .iter()
            .copied()
            .min_by(|left, right| {
                (*left - invoice.amount)
                    .abs()
                    .cmp(&(*right - invoice.amount).abs())
            })
            .unwrap_or(submission.claimed_amount);

        let payment = self
            .payment_repo
            .record_payment(InsertPaymentEntity {
                invoice_id: invoice.id,
                customer_id: submission.customer_id,
                amount,
                method: PAYMENT_METHOD.to_string(),
                reference: report.fields.reference_number.clone(),
                paid_at: now,
            })
            .await
            .map_err(BillingError::Internal)?;

        self.settle_invoice(invoice, amount, submission.subscription_id, now)
            .await?;

        info!(
            submission_id = %submission.id,
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            amount = %amount,
            "proof_verification: verified payment applied"
        );

        Ok(payment.id)
    }

    async fn settle_invoice(
        &self,
        invoice: &InvoiceEntity,
        amount: Decimal,
        subscription_id: Uuid,
        now: DateTime<Utc>,
    ) -> BillingResult<()> {
        let fully_paid = amount >= invoice.amount;
        let status = if fully_paid {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };

        let settled = self
            .invoice_repo
            .mark_settled(invoice.id, status, now)
            .await
            .map_err(BillingError::Internal)?;
        if !settled {
            warn!(
                invoice_id = %invoice.id,
                "proof_verification: invoice was settled concurrently"
            );
        }

        if fully_paid {
            self.subscription_repo
                .mark_payment_received(subscription_id)
                .await
                .map_err(BillingError::Internal)?;
        }

        Ok(())
    }

    async fn notify_outcome(&self, submission: &PaymentProofEntity, status: VerificationStatus) {
        let kind = match status {
            VerificationStatus::AutoVerified | VerificationStatus::Verified => {
                NotificationKind::PaymentVerified
            }
            VerificationStatus::NeedsReview => NotificationKind::ProofNeedsReview,
            VerificationStatus::AutoRejected | VerificationStatus::Rejected => {
                NotificationKind::ProofRejected
            }
            VerificationStatus::Pending => return,
        };

        if let Err(err) = self
            .notifier
            .notify(
                submission.customer_id,
                kind,
                json!({ "submission_id": submission.id, "status": status.as_str() }),
            )
            .await
        {
            warn!(
                submission_id = %submission.id,
                error = ?err,
                "proof_verification: outcome notification failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use mockall::predicate::eq;

    use crate::domain::{
        entities::{payments::PaymentEntity, subscriptions::SubscriptionEntity},
        repositories::{
            invoices::MockInvoiceRepository, payment_proofs::MockPaymentProofRepository,
            payments::MockPaymentRepository, subscriptions::MockSubscriptionRepository,
        },
    };
    use crate::application::notifier::MockBillingNotifier;
    use crate::domain::value_objects::payment_proofs::VerificationDecision;

    const GOOD_RECEIPT: &str = "Sent to: JUAN DELA CRUZ\n\
                                +63 917 123 4567\n\
                                Amount: 199.00\n\
                                Ref No. 9015334211788\n\
                                01/15/2026 15:45";

    fn policy() -> WalletProofPolicy {
        WalletProofPolicy::new("09171234567", None, Decimal::new(100, 2))
    }

    fn pending_submission() -> PaymentProofEntity {
        PaymentProofEntity {
            id: Uuid::new_v4(),
            subscription_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            claimed_amount: Decimal::new(19900, 2),
            image_ref: "proofs/receipt-001.jpg".to_string(),
            extracted_fields: None,
            checks: None,
            confidence: None,
            verification_status: "pending".to_string(),
            review_note: None,
            submitted_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn open_invoice(subscription_id: Uuid, amount: Decimal) -> InvoiceEntity {
        InvoiceEntity {
            id: Uuid::new_v4(),
            invoice_number: "INV-20260110-CCCCCC".to_string(),
            subscription_id,
            customer_id: Uuid::new_v4(),
            invoice_type: "subscription".to_string(),
            original_amount: amount,
            credit_applied: Decimal::ZERO,
            amount,
            status: "unpaid".to_string(),
            due_date: Utc::now(),
            generated_date: Utc::now().date_naive(),
            late_fee_applied: false,
            late_fee_amount: Decimal::ZERO,
            archived: false,
            notes: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    fn payment_entity(invoice_id: Uuid, amount: Decimal) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            invoice_id,
            customer_id: Uuid::new_v4(),
            amount,
            method: PAYMENT_METHOD.to_string(),
            reference: None,
            paid_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    struct Mocks {
        proof_repo: MockPaymentProofRepository,
        invoice_repo: MockInvoiceRepository,
        payment_repo: MockPaymentRepository,
        subscription_repo: MockSubscriptionRepository,
        extractor: MockTextExtractor,
        notifier: MockBillingNotifier,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                proof_repo: MockPaymentProofRepository::new(),
                invoice_repo: MockInvoiceRepository::new(),
                payment_repo: MockPaymentRepository::new(),
                subscription_repo: MockSubscriptionRepository::new(),
                extractor: MockTextExtractor::new(),
                notifier: MockBillingNotifier::new(),
            }
        }

        fn build(
            self,
        ) -> ProofVerificationUseCase<
            MockPaymentProofRepository,
            MockInvoiceRepository,
            MockPaymentRepository,
            MockSubscriptionRepository,
            MockTextExtractor,
            MockBillingNotifier,
        > {
            self.build_with_timeout(Duration::from_secs(5))
        }

        fn build_with_timeout(
            self,
            timeout: Duration,
        ) -> ProofVerificationUseCase<
            MockPaymentProofRepository,
            MockInvoiceRepository,
            MockPaymentRepository,
            MockSubscriptionRepository,
            MockTextExtractor,
            MockBillingNotifier,
        > {
            ProofVerificationUseCase::new(
                Arc::new(self.proof_repo),
                Arc::new(self.invoice_repo),
                Arc::new(self.payment_repo),
                Arc::new(self.subscription_repo),
                Arc::new(self.extractor),
                Arc::new(self.notifier),
                policy(),
                timeout,
            )
        }
    }

    fn expect_find_submission(mocks: &mut Mocks, submission: PaymentProofEntity) {
        mocks.proof_repo.expect_find_by_id().returning(move |_| {
            let submission = submission.clone();
            Box::pin(async move { Ok(Some(submission)) })
        });
    }

    #[tokio::test]
    async fn submit_rejects_non_positive_claim() {
        let error = Mocks::new()
            .build()
            .submit(
                NewProofSubmission {
                    subscription_id: Uuid::new_v4(),
                    claimed_amount: Decimal::ZERO,
                    image_ref: "proofs/x.jpg".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_requires_known_subscription() {
        let mut mocks = Mocks::new();
        mocks
            .subscription_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let error = mocks
            .build()
            .submit(
                NewProofSubmission {
                    subscription_id: Uuid::new_v4(),
                    claimed_amount: Decimal::new(19900, 2),
                    image_ref: "proofs/x.jpg".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, BillingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn good_receipt_auto_verifies_and_applies_payment() {
        let mut mocks = Mocks::new();
        let submission = pending_submission();
        let subscription_id = submission.subscription_id;
        let invoice = open_invoice(subscription_id, Decimal::new(19900, 2));
        let invoice_id = invoice.id;

        expect_find_submission(&mut mocks, submission.clone());
        mocks
            .invoice_repo
            .expect_find_open_for_subscription()
            .with(eq(subscription_id))
            .returning(move |_| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(Some(invoice)) })
            });
        mocks
            .extractor
            .expect_extract_text()
            .returning(|_| Box::pin(async { Ok(GOOD_RECEIPT.to_string()) }));
        mocks
            .proof_repo
            .expect_resolve()
            .withf(|_, expected, resolution| {
                *expected == VerificationStatus::Pending
                    && resolution.status == VerificationStatus::AutoVerified
                    && resolution.confidence == Some(100)
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        mocks
            .payment_repo
            .expect_record_payment()
            .withf(move |payment| {
                payment.invoice_id == invoice_id
                    && payment.amount == Decimal::new(19900, 2)
                    && payment.reference.as_deref() == Some("9015334211788")
            })
            .times(1)
            .returning(move |payment| {
                let entity = payment_entity(payment.invoice_id, payment.amount);
                Box::pin(async move { Ok(entity) })
            });
        mocks
            .invoice_repo
            .expect_mark_settled()
            .withf(move |id, status, _| *id == invoice_id && *status == InvoiceStatus::Paid)
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        mocks
            .subscription_repo
            .expect_mark_payment_received()
            .with(eq(subscription_id))
            .times(1)
            .returning(|_| Box::pin(async { Ok(true) }));
        mocks
            .notifier
            .expect_notify()
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let outcome = mocks
            .build()
            .verify_submission(submission.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.status, VerificationStatus::AutoVerified);
        assert_eq!(outcome.confidence, Some(100));
        assert!(outcome.payment_id.is_some());
    }

    #[tokio::test]
    async fn wrong_account_parks_for_review_without_payment() {
        let mut mocks = Mocks::new();
        let submission = pending_submission();
        let subscription_id = submission.subscription_id;
        let invoice = open_invoice(subscription_id, Decimal::new(19900, 2));

        expect_find_submission(&mut mocks, submission.clone());
        mocks
            .invoice_repo
            .expect_find_open_for_subscription()
            .returning(move |_| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(Some(invoice)) })
            });
        mocks.extractor.expect_extract_text().returning(|_| {
            Box::pin(async {
                Ok("0999 888 7777\nAmount: 199.00\nRef No. 9015334211788\n01/15/2026".to_string())
            })
        });
        mocks
            .proof_repo
            .expect_resolve()
            .withf(|_, _, resolution| resolution.status == VerificationStatus::NeedsReview)
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        mocks
            .notifier
            .expect_notify()
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let outcome = mocks
            .build()
            .verify_submission(submission.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.status, VerificationStatus::NeedsReview);
        assert!(outcome.payment_id.is_none());
        let report = outcome.report.unwrap();
        assert!(!report.is_valid);
    }

    #[tokio::test]
    async fn extraction_failure_resolves_to_needs_review() {
        let mut mocks = Mocks::new();
        let submission = pending_submission();

        expect_find_submission(&mut mocks, submission.clone());
        mocks
            .invoice_repo
            .expect_find_open_for_subscription()
            .returning(|_| Box::pin(async { Ok(None) }));
        mocks
            .extractor
            .expect_extract_text()
            .returning(|_| Box::pin(async { Err(anyhow!("engine crashed")) }));
        mocks
            .proof_repo
            .expect_resolve()
            .withf(|_, _, resolution| {
                resolution.status == VerificationStatus::NeedsReview
                    && resolution
                        .review_note
                        .as_deref()
                        .is_some_and(|note| note.contains("text extraction failed"))
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        mocks
            .notifier
            .expect_notify()
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let outcome = mocks
            .build()
            .verify_submission(submission.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.status, VerificationStatus::NeedsReview);
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn extraction_timeout_resolves_to_needs_review() {
        let mut mocks = Mocks::new();
        let submission = pending_submission();

        expect_find_submission(&mut mocks, submission.clone());
        mocks
            .invoice_repo
            .expect_find_open_for_subscription()
            .returning(|_| Box::pin(async { Ok(None) }));
        mocks.extractor.expect_extract_text().returning(|_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(String::new())
            })
        });
        mocks
            .proof_repo
            .expect_resolve()
            .withf(|_, _, resolution| {
                resolution.status == VerificationStatus::NeedsReview
                    && resolution
                        .review_note
                        .as_deref()
                        .is_some_and(|note| note.contains("timed out"))
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        mocks
            .notifier
            .expect_notify()
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let outcome = mocks
            .build_with_timeout(Duration::from_millis(20))
            .verify_submission(submission.id, Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.status, VerificationStatus::NeedsReview);
    }

    #[tokio::test]
    async fn resolved_submission_cannot_be_verified_again() {
        let mut mocks = Mocks::new();
        let mut submission = pending_submission();
        submission.verification_status = "auto_verified".to_string();

        expect_find_submission(&mut mocks, submission.clone());

        let error = mocks
            .build()
            .verify_submission(submission.id, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(error, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn approving_partial_payment_keeps_cycle_pending() {
        let mut mocks = Mocks::new();
        let mut submission = pending_submission();
        submission.verification_status = "needs_review".to_string();
        submission.claimed_amount = Decimal::new(10000, 2);
        let invoice = open_invoice(submission.subscription_id, Decimal::new(19900, 2));
        let invoice_id = invoice.id;

        expect_find_submission(&mut mocks, submission.clone());
        mocks
            .invoice_repo
            .expect_find_open_for_subscription()
            .returning(move |_| {
                let invoice = invoice.clone();
                Box::pin(async move { Ok(Some(invoice)) })
            });
        mocks
            .proof_repo
            .expect_resolve()
            .withf(|_, expected, resolution| {
                *expected == VerificationStatus::NeedsReview
                    && resolution.status == VerificationStatus::Verified
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        mocks
            .payment_repo
            .expect_record_payment()
            .returning(move |payment| {
                let entity = payment_entity(payment.invoice_id, payment.amount);
                Box::pin(async move { Ok(entity) })
            });
        mocks
            .invoice_repo
            .expect_mark_settled()
            .withf(move |id, status, _| {
                *id == invoice_id && *status == InvoiceStatus::PartiallyPaid
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        // No mark_payment_received expectation: a partial payment keeps
        // the subscription cycle pending.
        mocks
            .notifier
            .expect_notify()
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let outcome = mocks
            .build()
            .approve_submission(submission.id, Some("partial accepted".to_string()), Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.status, VerificationStatus::Verified);
        assert!(outcome.payment_id.is_some());
    }

    #[tokio::test]
    async fn evaluate_text_is_deterministic_and_gated_on_critical_checks() {
        let usecase = Mocks::new().build();

        let first = usecase.evaluate_text(GOOD_RECEIPT, Decimal::new(19900, 2));
        let second = usecase.evaluate_text(GOOD_RECEIPT, Decimal::new(19900, 2));

        assert_eq!(first, second);
        assert!(first.is_valid);
        assert_eq!(first.decision, VerificationDecision::AutoVerified);
    }

    #[tokio::test]
    async fn rejecting_terminal_submission_conflicts() {
        let mut mocks = Mocks::new();
        let mut submission = pending_submission();
        submission.verification_status = "rejected".to_string();

        expect_find_submission(&mut mocks, submission.clone());

        let error = mocks
            .build()
            .reject_submission(submission.id, None, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(error, BillingError::Conflict(_)));
    }

    #[tokio::test]
    async fn reject_resolves_needs_review_submission() {
        let mut mocks = Mocks::new();
        let mut submission = pending_submission();
        submission.verification_status = "needs_review".to_string();

        expect_find_submission(&mut mocks, submission.clone());
        mocks
            .proof_repo
            .expect_resolve()
            .withf(|_, expected, resolution| {
                *expected == VerificationStatus::NeedsReview
                    && resolution.status == VerificationStatus::Rejected
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        mocks
            .notifier
            .expect_notify()
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let outcome = mocks
            .build()
            .reject_submission(submission.id, Some("unreadable".to_string()), Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.status, VerificationStatus::Rejected);
        assert!(outcome.payment_id.is_none());
    }
}
