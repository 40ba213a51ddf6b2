use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::{
    application::errors::{BillingError, BillingResult},
    domain::{
        entities::{invoices::InvoiceEntity, subscriptions::SubscriptionEntity},
        repositories::{
            invoices::InvoiceRepository, plans::PlanRepository,
            pricing::PricingConfigRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::invoice_types::InvoiceType,
            invoices::{next_invoice_number, CreateInvoiceRequest, InvoiceDraft, InvoiceRunSummary},
            pricing::PricingConfig,
        },
    },
};

/// Days between generation and due date for cycle invoices.
pub const INVOICE_DUE_DAYS: i64 = 7;

/// Creates invoices, letting any credit the customer holds reduce the
/// billed amount. The credit read and the insert are isolated in one
/// serializable transaction by the storage layer.
pub struct InvoiceGenerationUseCase<S, I, Pl, Cfg>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    Pl: PlanRepository + Send + Sync + 'static,
    Cfg: PricingConfigRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    invoice_repo: Arc<I>,
    plan_repo: Arc<Pl>,
    pricing_repo: Arc<Cfg>,
}

impl<S, I, Pl, Cfg> InvoiceGenerationUseCase<S, I, Pl, Cfg>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    Pl: PlanRepository + Send + Sync + 'static,
    Cfg: PricingConfigRepository + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        invoice_repo: Arc<I>,
        plan_repo: Arc<Pl>,
        pricing_repo: Arc<Cfg>,
    ) -> Self {
        Self {
            subscription_repo,
            invoice_repo,
            plan_repo,
            pricing_repo,
        }
    }

    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
        now: DateTime<Utc>,
    ) -> BillingResult<InvoiceEntity> {
        if request.base_amount < Decimal::ZERO {
            return Err(BillingError::Validation(format!(
                "base amount must not be negative, got {}",
                request.base_amount
            )));
        }

        let subscription = self
            .subscription_repo
            .find_by_id(request.subscription_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| BillingError::not_found("subscription", request.subscription_id))?;

        let draft = InvoiceDraft {
            invoice_number: next_invoice_number(now.date_naive()),
            subscription_id: subscription.id,
            customer_id: subscription.customer_id,
            invoice_type: request.invoice_type,
            base_amount: request.base_amount,
            due_date: request.due_date,
            generated_date: now.date_naive(),
            notes: request.notes,
        };

        let invoice = self
            .invoice_repo
            .create_credit_aware(draft)
            .await
            .map_err(|err| {
                error!(
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "invoice_generation: failed to persist invoice"
                );
                BillingError::Internal(err)
            })?;

        if invoice.amount < Decimal::ZERO {
            error!(
                invoice_id = %invoice.id,
                amount = %invoice.amount,
                "invoice_generation: computed amount below zero"
            );
            return Err(BillingError::DataIntegrity(format!(
                "invoice {} computed with negative amount {}",
                invoice.id, invoice.amount
            )));
        }

        if invoice.amount == Decimal::ZERO {
            info!(
                invoice_id = %invoice.id,
                credit_applied = %invoice.credit_applied,
                "invoice_generation: invoice netted to zero by credit, settled at creation"
            );
        } else {
            let grace_period_end = self.grace_period_end(invoice.due_date).await;
            self.subscription_repo
                .begin_pending_cycle(subscription.id, grace_period_end)
                .await
                .map_err(|err| {
                    error!(
                        subscription_id = %subscription.id,
                        db_error = ?err,
                        "invoice_generation: failed to open pending cycle"
                    );
                    BillingError::Internal(err)
                })?;
        }

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            subscription_id = %subscription.id,
            original_amount = %invoice.original_amount,
            credit_applied = %invoice.credit_applied,
            amount = %invoice.amount,
            "invoice_generation: invoice created"
        );

        Ok(invoice)
    }

    /// Batch over billable monthly subscriptions. Each item is isolated:
    /// one bad subscription is logged and counted, the rest proceed.
    pub async fn generate_monthly_invoices(
        &self,
        today: NaiveDate,
    ) -> BillingResult<InvoiceRunSummary> {
        let subscriptions = self
            .subscription_repo
            .list_billable_monthly(today)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "invoice_generation: failed to list billable subscriptions");
                BillingError::Internal(err)
            })?;

        info!(
            candidates = subscriptions.len(),
            %today,
            "invoice_generation: monthly batch started"
        );

        let grace_days = self.pricing().await.grace_period_days;
        let mut summary = InvoiceRunSummary::default();

        for subscription in subscriptions {
            match self
                .generate_for_subscription(&subscription, today, grace_days)
                .await
            {
                Ok(true) => summary.generated += 1,
                Ok(false) => summary.skipped += 1,
                Err(err) => {
                    error!(
                        subscription_id = %subscription.id,
                        error = ?err,
                        "invoice_generation: batch item failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            "invoice_generation: monthly batch finished"
        );

        Ok(summary)
    }

    async fn generate_for_subscription(
        &self,
        subscription: &SubscriptionEntity,
        today: NaiveDate,
        grace_days: i64,
    ) -> BillingResult<bool> {
        let plan = match self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(BillingError::Internal)?
        {
            Some(plan) => plan,
            None => {
                warn!(
                    subscription_id = %subscription.id,
                    plan_id = %subscription.plan_id,
                    "invoice_generation: subscription has no plan data, skipping"
                );
                return Ok(false);
            }
        };

        if self
            .invoice_repo
            .has_open_for_subscription(subscription.id)
            .await
            .map_err(BillingError::Internal)?
        {
            debug!(
                subscription_id = %subscription.id,
                "invoice_generation: open invoice already exists for cycle"
            );
            return Ok(false);
        }

        if self
            .invoice_repo
            .has_invoice_generated_on(subscription.id, today)
            .await
            .map_err(BillingError::Internal)?
        {
            debug!(
                subscription_id = %subscription.id,
                "invoice_generation: invoice already generated today"
            );
            return Ok(false);
        }

        let due_date = (today + Duration::days(INVOICE_DUE_DAYS))
            .and_time(NaiveTime::MIN)
            .and_utc();

        let draft = InvoiceDraft {
            invoice_number: next_invoice_number(today),
            subscription_id: subscription.id,
            customer_id: subscription.customer_id,
            invoice_type: InvoiceType::Subscription,
            base_amount: plan.price,
            due_date,
            generated_date: today,
            notes: None,
        };

        // The storage layer re-checks both guards inside the transaction,
        // so a racing run simply loses and we count a skip.
        let invoice = match self
            .invoice_repo
            .create_cycle_guarded(draft)
            .await
            .map_err(BillingError::Internal)?
        {
            Some(invoice) => invoice,
            None => {
                debug!(
                    subscription_id = %subscription.id,
                    "invoice_generation: cycle guard tripped at write time"
                );
                return Ok(false);
            }
        };

        if invoice.amount > Decimal::ZERO {
            let grace_period_end = due_date + Duration::days(grace_days);
            self.subscription_repo
                .begin_pending_cycle(subscription.id, grace_period_end)
                .await
                .map_err(BillingError::Internal)?;
        }

        info!(
            subscription_id = %subscription.id,
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            amount = %invoice.amount,
            "invoice_generation: cycle invoice created"
        );

        Ok(true)
    }

    async fn pricing(&self) -> PricingConfig {
        match self.pricing_repo.get_pricing_config().await {
            Ok(Some(config)) => config,
            Ok(None) => PricingConfig::default(),
            Err(err) => {
                warn!(
                    error = ?err,
                    "invoice_generation: pricing config unavailable, using defaults"
                );
                PricingConfig::default()
            }
        }
    }

    async fn grace_period_end(&self, due_date: DateTime<Utc>) -> DateTime<Utc> {
        due_date + Duration::days(self.pricing().await.grace_period_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use crate::domain::{
        entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
        repositories::{
            invoices::MockInvoiceRepository, plans::MockPlanRepository,
            pricing::MockPricingConfigRepository, subscriptions::MockSubscriptionRepository,
        },
    };

    fn sample_subscription(plan_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            plan_id,
            status: "active".to_string(),
            payment_status: "paid".to_string(),
            billing_start_date: now.date_naive(),
            next_billing_date: now.date_naive(),
            grace_period_end: None,
            suspended_at: None,
            cancelled_at: None,
            reactivated_at: None,
            billing_cycle_count: 1,
            created_at: now,
        }
    }

    fn sample_plan(id: Uuid, price: Decimal) -> PlanEntity {
        PlanEntity {
            id,
            name: "Standard".to_string(),
            price,
            billing_frequency: "monthly".to_string(),
            is_active: true,
        }
    }

    fn invoice_from_draft(draft: &InvoiceDraft, credit_applied: Decimal) -> InvoiceEntity {
        let amount = (draft.base_amount - credit_applied).max(Decimal::ZERO);
        InvoiceEntity {
            id: Uuid::new_v4(),
            invoice_number: draft.invoice_number.clone(),
            subscription_id: draft.subscription_id,
            customer_id: draft.customer_id,
            invoice_type: draft.invoice_type.as_str().to_string(),
            original_amount: draft.base_amount,
            credit_applied,
            amount,
            status: if amount == Decimal::ZERO {
                "paid".to_string()
            } else {
                "unpaid".to_string()
            },
            due_date: draft.due_date,
            generated_date: draft.generated_date,
            late_fee_applied: false,
            late_fee_amount: Decimal::ZERO,
            archived: false,
            notes: draft.notes.clone(),
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    fn no_pricing(pricing_repo: &mut MockPricingConfigRepository) {
        pricing_repo
            .expect_get_pricing_config()
            .returning(|| Box::pin(async { Ok(None) }));
    }

    fn usecase(
        subscription_repo: MockSubscriptionRepository,
        invoice_repo: MockInvoiceRepository,
        plan_repo: MockPlanRepository,
        pricing_repo: MockPricingConfigRepository,
    ) -> InvoiceGenerationUseCase<
        MockSubscriptionRepository,
        MockInvoiceRepository,
        MockPlanRepository,
        MockPricingConfigRepository,
    > {
        InvoiceGenerationUseCase::new(
            Arc::new(subscription_repo),
            Arc::new(invoice_repo),
            Arc::new(plan_repo),
            Arc::new(pricing_repo),
        )
    }

    #[tokio::test]
    async fn rejects_negative_base_amount() {
        let error = usecase(
            MockSubscriptionRepository::new(),
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            MockPricingConfigRepository::new(),
        )
        .create_invoice(
            CreateInvoiceRequest {
                subscription_id: Uuid::new_v4(),
                base_amount: Decimal::new(-100, 2),
                due_date: Utc::now(),
                invoice_type: InvoiceType::Subscription,
                notes: None,
            },
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_subscription_is_not_found() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let error = usecase(
            subscription_repo,
            MockInvoiceRepository::new(),
            MockPlanRepository::new(),
            MockPricingConfigRepository::new(),
        )
        .create_invoice(
            CreateInvoiceRequest {
                subscription_id: Uuid::new_v4(),
                base_amount: Decimal::new(19900, 2),
                due_date: Utc::now(),
                invoice_type: InvoiceType::Subscription,
                notes: None,
            },
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, BillingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn credit_reduces_billed_amount_and_cycle_opens() {
        let subscription = sample_subscription(Uuid::new_v4());
        let subscription_id = subscription.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();
        let mut pricing_repo = MockPricingConfigRepository::new();

        subscription_repo.expect_find_by_id().returning(move |_| {
            let subscription = subscription.clone();
            Box::pin(async move { Ok(Some(subscription)) })
        });
        // Customer holds 100.00 credit against a 199.00 charge.
        invoice_repo
            .expect_create_credit_aware()
            .returning(|draft| {
                Box::pin(async move { Ok(invoice_from_draft(&draft, Decimal::new(10000, 2))) })
            });
        subscription_repo
            .expect_begin_pending_cycle()
            .with(eq(subscription_id), mockall::predicate::always())
            .returning(|_, _| Box::pin(async { Ok(true) }));
        no_pricing(&mut pricing_repo);

        let invoice = usecase(
            subscription_repo,
            invoice_repo,
            MockPlanRepository::new(),
            pricing_repo,
        )
        .create_invoice(
            CreateInvoiceRequest {
                subscription_id,
                base_amount: Decimal::new(19900, 2),
                due_date: Utc::now(),
                invoice_type: InvoiceType::Subscription,
                notes: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(invoice.original_amount, Decimal::new(19900, 2));
        assert_eq!(invoice.credit_applied, Decimal::new(10000, 2));
        assert_eq!(invoice.amount, Decimal::new(9900, 2));
    }

    #[tokio::test]
    async fn zero_amount_invoice_skips_pending_cycle() {
        let subscription = sample_subscription(Uuid::new_v4());
        let subscription_id = subscription.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();

        subscription_repo.expect_find_by_id().returning(move |_| {
            let subscription = subscription.clone();
            Box::pin(async move { Ok(Some(subscription)) })
        });
        invoice_repo
            .expect_create_credit_aware()
            .returning(|draft| {
                let credit = draft.base_amount;
                Box::pin(async move { Ok(invoice_from_draft(&draft, credit)) })
            });
        // No begin_pending_cycle expectation: calling it would panic.

        let invoice = usecase(
            subscription_repo,
            invoice_repo,
            MockPlanRepository::new(),
            MockPricingConfigRepository::new(),
        )
        .create_invoice(
            CreateInvoiceRequest {
                subscription_id,
                base_amount: Decimal::new(19900, 2),
                due_date: Utc::now(),
                invoice_type: InvoiceType::Subscription,
                notes: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(invoice.amount, Decimal::ZERO);
        assert_eq!(invoice.status, "paid");
    }

    #[tokio::test]
    async fn monthly_batch_skips_missing_plans_and_continues() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let good_plan_id = Uuid::new_v4();
        let missing_plan_id = Uuid::new_v4();
        let good = sample_subscription(good_plan_id);
        let orphan = sample_subscription(missing_plan_id);

        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();
        let mut plan_repo = MockPlanRepository::new();
        let mut pricing_repo = MockPricingConfigRepository::new();

        let batch = vec![orphan, good];
        subscription_repo
            .expect_list_billable_monthly()
            .returning(move |_| {
                let batch = batch.clone();
                Box::pin(async move { Ok(batch) })
            });
        plan_repo
            .expect_find_by_id()
            .with(eq(missing_plan_id))
            .returning(|_| Box::pin(async { Ok(None) }));
        plan_repo
            .expect_find_by_id()
            .with(eq(good_plan_id))
            .returning(move |id| {
                Box::pin(async move { Ok(Some(sample_plan(id, Decimal::new(19900, 2)))) })
            });
        invoice_repo
            .expect_has_open_for_subscription()
            .returning(|_| Box::pin(async { Ok(false) }));
        invoice_repo
            .expect_has_invoice_generated_on()
            .returning(|_, _| Box::pin(async { Ok(false) }));
        invoice_repo
            .expect_create_cycle_guarded()
            .returning(|draft| {
                Box::pin(async move { Ok(Some(invoice_from_draft(&draft, Decimal::ZERO))) })
            });
        subscription_repo
            .expect_begin_pending_cycle()
            .returning(|_, _| Box::pin(async { Ok(true) }));
        no_pricing(&mut pricing_repo);

        let summary = usecase(subscription_repo, invoice_repo, plan_repo, pricing_repo)
            .generate_monthly_invoices(today)
            .await
            .unwrap();

        assert_eq!(summary.generated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn open_invoice_guard_skips_subscription() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let plan_id = Uuid::new_v4();
        let subscription = sample_subscription(plan_id);

        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();
        let mut plan_repo = MockPlanRepository::new();
        let mut pricing_repo = MockPricingConfigRepository::new();

        let batch = vec![subscription];
        subscription_repo
            .expect_list_billable_monthly()
            .returning(move |_| {
                let batch = batch.clone();
                Box::pin(async move { Ok(batch) })
            });
        plan_repo.expect_find_by_id().returning(move |id| {
            Box::pin(async move { Ok(Some(sample_plan(id, Decimal::new(19900, 2)))) })
        });
        invoice_repo
            .expect_has_open_for_subscription()
            .returning(|_| Box::pin(async { Ok(true) }));
        no_pricing(&mut pricing_repo);

        let summary = usecase(subscription_repo, invoice_repo, plan_repo, pricing_repo)
            .generate_monthly_invoices(today)
            .await
            .unwrap();

        assert_eq!(summary.generated, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn batch_counts_failures_and_keeps_going() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let failing_plan = Uuid::new_v4();
        let working_plan = Uuid::new_v4();
        let failing = sample_subscription(failing_plan);
        let working = sample_subscription(working_plan);

        let mut subscription_repo = MockSubscriptionRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();
        let mut plan_repo = MockPlanRepository::new();
        let mut pricing_repo = MockPricingConfigRepository::new();

        let batch = vec![failing, working];
        subscription_repo
            .expect_list_billable_monthly()
            .returning(move |_| {
                let batch = batch.clone();
                Box::pin(async move { Ok(batch) })
            });
        plan_repo
            .expect_find_by_id()
            .with(eq(failing_plan))
            .returning(|_| Box::pin(async { Err(anyhow!("plan table unreachable")) }));
        plan_repo
            .expect_find_by_id()
            .with(eq(working_plan))
            .returning(move |id| {
                Box::pin(async move { Ok(Some(sample_plan(id, Decimal::new(19900, 2)))) })
            });
        invoice_repo
            .expect_has_open_for_subscription()
            .returning(|_| Box::pin(async { Ok(false) }));
        invoice_repo
            .expect_has_invoice_generated_on()
            .returning(|_, _| Box::pin(async { Ok(false) }));
        invoice_repo
            .expect_create_cycle_guarded()
            .returning(|draft| {
                Box::pin(async move { Ok(Some(invoice_from_draft(&draft, Decimal::ZERO))) })
            });
        subscription_repo
            .expect_begin_pending_cycle()
            .returning(|_, _| Box::pin(async { Ok(true) }));
        no_pricing(&mut pricing_repo);

        let summary = usecase(subscription_repo, invoice_repo, plan_repo, pricing_repo)
            .generate_monthly_invoices(today)
            .await
            .unwrap();

        assert_eq!(summary.generated, 1);
        assert_eq!(summary.failed, 1);
    }
}
