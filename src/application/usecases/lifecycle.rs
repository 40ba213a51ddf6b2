use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    application::{
        errors::{BillingError, BillingResult},
        notifier::{BillingNotifier, NotificationKind},
        usecases::invoice_generation::InvoiceGenerationUseCase,
    },
    domain::{
        entities::{collection_jobs::InsertCollectionJobEntity, subscriptions::SubscriptionEntity},
        repositories::{
            collection_jobs::CollectionJobRepository, invoices::InvoiceRepository,
            plans::PlanRepository, pricing::PricingConfigRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::{
                invoice_types::InvoiceType, subscription_statuses::SubscriptionStatus,
            },
            invoices::CreateInvoiceRequest,
            lifecycle::{ReactivationOutcome, ReactivationPath, SweepSummary},
            pricing::PricingConfig,
        },
    },
};

/// Days a suspension may age before the sweep cancels the subscription.
pub const DEFAULT_CANCEL_AFTER_SUSPENSION_DAYS: i64 = 30;
/// Elapsed time since cancellation after which reactivation takes the
/// enhanced path (stale invoices archived, collection schedule reset).
pub const DEFAULT_ENHANCED_REACTIVATION_DAYS: i64 = 90;
/// Due period granted on the invoice issued by a reactivation.
pub const REACTIVATION_DUE_DAYS: i64 = 7;
/// Delay before the first dunning notice after a suspension.
pub const COLLECTION_NOTICE_DELAY_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    pub cancel_after_suspension_days: i64,
    pub enhanced_reactivation_days: i64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            cancel_after_suspension_days: DEFAULT_CANCEL_AFTER_SUSPENSION_DAYS,
            enhanced_reactivation_days: DEFAULT_ENHANCED_REACTIVATION_DAYS,
        }
    }
}

/// Daily state-machine sweep plus the out-of-band reactivation operation.
/// The running flag lives on the struct, not in a process global, so a
/// second scheduler instance (or a test) owns its own flag.
pub struct LifecycleUseCase<S, I, Pl, Cfg, N, J>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    Pl: PlanRepository + Send + Sync + 'static,
    Cfg: PricingConfigRepository + Send + Sync + 'static,
    N: BillingNotifier + Send + Sync + 'static,
    J: CollectionJobRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    invoice_repo: Arc<I>,
    plan_repo: Arc<Pl>,
    pricing_repo: Arc<Cfg>,
    notifier: Arc<N>,
    collection_jobs: Arc<J>,
    invoice_gen: Arc<InvoiceGenerationUseCase<S, I, Pl, Cfg>>,
    policy: LifecyclePolicy,
    running: AtomicBool,
}

impl<S, I, Pl, Cfg, N, J> LifecycleUseCase<S, I, Pl, Cfg, N, J>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    Pl: PlanRepository + Send + Sync + 'static,
    Cfg: PricingConfigRepository + Send + Sync + 'static,
    N: BillingNotifier + Send + Sync + 'static,
    J: CollectionJobRepository + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subscription_repo: Arc<S>,
        invoice_repo: Arc<I>,
        plan_repo: Arc<Pl>,
        pricing_repo: Arc<Cfg>,
        notifier: Arc<N>,
        collection_jobs: Arc<J>,
        invoice_gen: Arc<InvoiceGenerationUseCase<S, I, Pl, Cfg>>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            subscription_repo,
            invoice_repo,
            plan_repo,
            pricing_repo,
            notifier,
            collection_jobs,
            invoice_gen,
            policy,
            running: AtomicBool::new(false),
        }
    }

    /// One daily tick. Stages run in fixed order; each one catches its own
    /// failure so a broken stage never starves the ones after it, and each
    /// stage's predicate re-checks at write time so a full re-run applies
    /// no duplicate effects.
    pub async fn run_daily_sweep(&self, now: DateTime<Utc>) -> BillingResult<SweepSummary> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BillingError::Conflict(
                "lifecycle sweep is already running".to_string(),
            ));
        }

        info!(%now, "lifecycle: daily sweep started");
        let mut summary = SweepSummary::default();
        let today = now.date_naive();

        match self.invoice_repo.mark_overdue_past_due(now).await {
            Ok(count) => summary.overdue_marked = count,
            Err(err) => {
                error!(db_error = ?err, "lifecycle: mark_overdue_invoices stage failed");
                summary
                    .stage_errors
                    .push(format!("mark_overdue_invoices: {err}"));
            }
        }

        match self.subscription_repo.suspend_past_grace(now).await {
            Ok(suspended) => {
                summary.suspended = suspended.len() as u64;
                for subscription in &suspended {
                    self.after_suspension(subscription, now).await;
                }
            }
            Err(err) => {
                error!(db_error = ?err, "lifecycle: suspend_overdue_subscriptions stage failed");
                summary
                    .stage_errors
                    .push(format!("suspend_overdue_subscriptions: {err}"));
            }
        }

        let cutoff = now - Duration::days(self.policy.cancel_after_suspension_days);
        match self
            .subscription_repo
            .cancel_suspended_before(cutoff, now)
            .await
        {
            Ok(cancelled) => {
                summary.cancelled = cancelled.len() as u64;
                for subscription in &cancelled {
                    self.after_cancellation(subscription).await;
                }
            }
            Err(err) => {
                error!(db_error = ?err, "lifecycle: cancel_long_suspended stage failed");
                summary
                    .stage_errors
                    .push(format!("cancel_long_suspended: {err}"));
            }
        }

        match self.invoice_gen.generate_monthly_invoices(today).await {
            Ok(invoices) => summary.invoices = invoices,
            Err(err) => {
                error!(error = ?err, "lifecycle: generate_monthly_invoices stage failed");
                summary
                    .stage_errors
                    .push(format!("generate_monthly_invoices: {err}"));
            }
        }

        self.advance_billing_dates(today, &mut summary).await;

        info!(
            overdue_marked = summary.overdue_marked,
            suspended = summary.suspended,
            cancelled = summary.cancelled,
            invoices_generated = summary.invoices.generated,
            billing_dates_advanced = summary.billing_dates_advanced,
            stage_errors = summary.stage_errors.len(),
            "lifecycle: daily sweep finished"
        );

        self.running.store(false, Ordering::SeqCst);
        Ok(summary)
    }

    async fn after_suspension(&self, subscription: &SubscriptionEntity, now: DateTime<Utc>) {
        let job = InsertCollectionJobEntity {
            subscription_id: subscription.id,
            kind: "collection_notice".to_string(),
            payload: json!({ "customer_id": subscription.customer_id }),
            run_at: now + Duration::days(COLLECTION_NOTICE_DELAY_DAYS),
            status: "pending".to_string(),
        };
        if let Err(err) = self.collection_jobs.schedule(job).await {
            warn!(
                subscription_id = %subscription.id,
                error = ?err,
                "lifecycle: failed to schedule collection notice"
            );
        }

        if let Err(err) = self
            .notifier
            .notify(
                subscription.customer_id,
                NotificationKind::SubscriptionSuspended,
                json!({ "subscription_id": subscription.id }),
            )
            .await
        {
            warn!(
                subscription_id = %subscription.id,
                error = ?err,
                "lifecycle: suspension notification failed"
            );
        }
    }

    async fn after_cancellation(&self, subscription: &SubscriptionEntity) {
        if let Err(err) = self
            .collection_jobs
            .cancel_pending_for_subscription(subscription.id)
            .await
        {
            warn!(
                subscription_id = %subscription.id,
                error = ?err,
                "lifecycle: failed to clear collection schedule on cancel"
            );
        }

        if let Err(err) = self
            .notifier
            .notify(
                subscription.customer_id,
                NotificationKind::SubscriptionCancelled,
                json!({ "subscription_id": subscription.id }),
            )
            .await
        {
            warn!(
                subscription_id = %subscription.id,
                error = ?err,
                "lifecycle: cancellation notification failed"
            );
        }
    }

    async fn advance_billing_dates(&self, today: NaiveDate, summary: &mut SweepSummary) {
        let due = match self.subscription_repo.list_due_for_advance(today).await {
            Ok(due) => due,
            Err(err) => {
                error!(db_error = ?err, "lifecycle: advance_billing_dates stage failed");
                summary
                    .stage_errors
                    .push(format!("advance_billing_dates: {err}"));
                return;
            }
        };

        for subscription in due {
            let Some(next) = subscription
                .next_billing_date
                .checked_add_months(Months::new(1))
            else {
                error!(
                    subscription_id = %subscription.id,
                    next_billing_date = %subscription.next_billing_date,
                    "lifecycle: billing date overflow"
                );
                summary.stage_errors.push(format!(
                    "advance_billing_dates: date overflow for {}",
                    subscription.id
                ));
                continue;
            };

            match self
                .subscription_repo
                .advance_billing_date(subscription.id, subscription.next_billing_date, next)
                .await
            {
                Ok(true) => summary.billing_dates_advanced += 1,
                Ok(false) => {
                    // A concurrent run advanced it first.
                    debug!(
                        subscription_id = %subscription.id,
                        "lifecycle: billing date already advanced"
                    );
                }
                Err(err) => {
                    error!(
                        subscription_id = %subscription.id,
                        db_error = ?err,
                        "lifecycle: failed to advance billing date"
                    );
                    summary.stage_errors.push(format!(
                        "advance_billing_dates: {} for {}",
                        err, subscription.id
                    ));
                }
            }
        }
    }

    /// Externally triggered; not part of the sweep. Brings a suspended or
    /// cancelled subscription back to pending_payment with a fresh
    /// lifecycle and an invoice to settle.
    pub async fn reactivate(
        &self,
        subscription_id: Uuid,
        now: DateTime<Utc>,
    ) -> BillingResult<ReactivationOutcome> {
        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| BillingError::not_found("subscription", subscription_id))?;

        let status = SubscriptionStatus::from_str(&subscription.status).ok_or_else(|| {
            BillingError::DataIntegrity(format!(
                "subscription {} has unknown status {:?}",
                subscription.id, subscription.status
            ))
        })?;

        if !status.is_reactivatable() {
            return Err(BillingError::Conflict(format!(
                "subscription is {status}; only suspended or cancelled subscriptions can be reactivated"
            )));
        }

        let dormant_since = subscription
            .cancelled_at
            .or(subscription.suspended_at)
            .unwrap_or(now);
        let path = if now - dormant_since > Duration::days(self.policy.enhanced_reactivation_days)
        {
            ReactivationPath::Enhanced
        } else {
            ReactivationPath::Standard
        };

        let mut archived_invoices = 0;
        let mut collection_jobs_cancelled = 0;
        if path == ReactivationPath::Enhanced {
            // Long-dormant customers restart with a clean ledger: stale
            // unpaid invoices leave the balance and the dunning schedule
            // is reset.
            archived_invoices = self
                .invoice_repo
                .archive_unpaid_for_subscription(subscription.id)
                .await
                .map_err(BillingError::Internal)?;
            collection_jobs_cancelled = self
                .collection_jobs
                .cancel_pending_for_subscription(subscription.id)
                .await
                .map_err(BillingError::Internal)?;
        }

        let billing_start_date = now.date_naive();
        let next_billing_date = billing_start_date
            .checked_add_months(Months::new(1))
            .ok_or_else(|| {
                BillingError::Internal(anyhow::anyhow!(
                    "billing date overflow for {billing_start_date}"
                ))
            })?;

        let updated = self
            .subscription_repo
            .reactivate(subscription.id, now, billing_start_date, next_billing_date)
            .await
            .map_err(BillingError::Internal)?;
        if !updated {
            return Err(BillingError::Conflict(
                "subscription state changed concurrently".to_string(),
            ));
        }

        let base_amount = match self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(BillingError::Internal)?
        {
            Some(plan) => plan.price,
            None => {
                warn!(
                    subscription_id = %subscription.id,
                    plan_id = %subscription.plan_id,
                    "lifecycle: plan missing on reactivation, billing configured price"
                );
                self.pricing().await.subscription_price
            }
        };

        let invoice = self
            .invoice_gen
            .create_invoice(
                CreateInvoiceRequest {
                    subscription_id: subscription.id,
                    base_amount,
                    due_date: now + Duration::days(REACTIVATION_DUE_DAYS),
                    invoice_type: InvoiceType::Reactivation,
                    notes: Some(format!("reactivation ({path})")),
                },
                now,
            )
            .await?;

        if let Err(err) = self
            .notifier
            .notify(
                subscription.customer_id,
                NotificationKind::SubscriptionReactivated,
                json!({
                    "subscription_id": subscription.id,
                    "path": path.as_str(),
                    "invoice_id": invoice.id,
                }),
            )
            .await
        {
            warn!(
                subscription_id = %subscription.id,
                error = ?err,
                "lifecycle: reactivation notification failed"
            );
        }

        info!(
            subscription_id = %subscription.id,
            path = %path,
            invoice_id = %invoice.id,
            archived_invoices,
            collection_jobs_cancelled,
            "lifecycle: subscription reactivated"
        );

        Ok(ReactivationOutcome {
            subscription_id: subscription.id,
            path,
            invoice_id: Some(invoice.id),
            archived_invoices,
            collection_jobs_cancelled,
        })
    }

    async fn pricing(&self) -> PricingConfig {
        match self.pricing_repo.get_pricing_config().await {
            Ok(Some(config)) => config,
            Ok(None) => PricingConfig::default(),
            Err(err) => {
                warn!(error = ?err, "lifecycle: pricing config unavailable, using defaults");
                PricingConfig::default()
            }
        }
    }
}
