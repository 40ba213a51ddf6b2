use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    application::{
        errors::{BillingError, BillingResult},
        notifier::{BillingNotifier, NotificationKind},
    },
    domain::{
        repositories::{invoices::InvoiceRepository, pricing::PricingConfigRepository},
        value_objects::{
            enums::invoice_statuses::InvoiceStatus,
            late_fees::{LateFeeEligibility, LateFeeRunSummary},
            pricing::PricingConfig,
        },
    },
};

/// Applies the configured late fee to unpaid subscription invoices whose
/// grace period has elapsed, exactly once per invoice.
pub struct LateFeeUseCase<I, Cfg, N>
where
    I: InvoiceRepository + Send + Sync + 'static,
    Cfg: PricingConfigRepository + Send + Sync + 'static,
    N: BillingNotifier + Send + Sync + 'static,
{
    invoice_repo: Arc<I>,
    pricing_repo: Arc<Cfg>,
    notifier: Arc<N>,
}

impl<I, Cfg, N> LateFeeUseCase<I, Cfg, N>
where
    I: InvoiceRepository + Send + Sync + 'static,
    Cfg: PricingConfigRepository + Send + Sync + 'static,
    N: BillingNotifier + Send + Sync + 'static,
{
    pub fn new(invoice_repo: Arc<I>, pricing_repo: Arc<Cfg>, notifier: Arc<N>) -> Self {
        Self {
            invoice_repo,
            pricing_repo,
            notifier,
        }
    }

    /// Safe to re-run at any time: the fee flag is re-checked in the SQL
    /// predicate, so a second pass (or a concurrent one) no-ops per
    /// invoice.
    pub async fn process_late_fees(&self, now: DateTime<Utc>) -> BillingResult<LateFeeRunSummary> {
        let pricing = self.pricing().await;
        let cutoff = now - Duration::days(pricing.grace_period_days);

        let candidates = self
            .invoice_repo
            .list_late_fee_candidates(cutoff)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "late_fees: failed to list candidates");
                BillingError::Internal(err)
            })?;

        info!(
            candidates = candidates.len(),
            fee = %pricing.late_fee_amount,
            grace_period_days = pricing.grace_period_days,
            "late_fees: sweep started"
        );

        let mut summary = LateFeeRunSummary::default();
        let note = format!(
            "late fee {} applied after {}-day grace period",
            pricing.late_fee_amount, pricing.grace_period_days
        );

        for invoice in candidates {
            match self
                .invoice_repo
                .apply_late_fee(invoice.id, pricing.late_fee_amount, &note)
                .await
            {
                Ok(true) => {
                    summary.processed_count += 1;
                    summary.total_fees_applied += pricing.late_fee_amount;

                    // Best-effort only; an unreachable notifier must not
                    // undo the fee.
                    if let Err(err) = self
                        .notifier
                        .notify(
                            invoice.customer_id,
                            NotificationKind::LateFeeApplied,
                            json!({
                                "invoice_id": invoice.id,
                                "invoice_number": invoice.invoice_number,
                                "late_fee_amount": pricing.late_fee_amount,
                            }),
                        )
                        .await
                    {
                        warn!(
                            invoice_id = %invoice.id,
                            customer_id = %invoice.customer_id,
                            error = ?err,
                            "late_fees: notification failed"
                        );
                    }
                }
                Ok(false) => {
                    debug!(
                        invoice_id = %invoice.id,
                        "late_fees: fee already applied at write time"
                    );
                }
                Err(err) => {
                    error!(
                        invoice_id = %invoice.id,
                        db_error = ?err,
                        "late_fees: failed to apply fee"
                    );
                }
            }
        }

        info!(
            processed_count = summary.processed_count,
            total_fees_applied = %summary.total_fees_applied,
            "late_fees: sweep finished"
        );

        Ok(summary)
    }

    /// Administrative read; mutates nothing.
    pub async fn late_fee_eligibility(
        &self,
        invoice_id: Uuid,
        now: DateTime<Utc>,
    ) -> BillingResult<LateFeeEligibility> {
        let invoice = self
            .invoice_repo
            .find_by_id(invoice_id)
            .await
            .map_err(BillingError::Internal)?
            .ok_or_else(|| BillingError::not_found("invoice", invoice_id))?;

        if invoice.late_fee_applied {
            return Ok(LateFeeEligibility {
                eligible: false,
                reason: "late fee already applied".to_string(),
                days_overdue: None,
                days_until_eligible: None,
            });
        }

        if invoice.archived {
            return Ok(LateFeeEligibility {
                eligible: false,
                reason: "invoice is archived".to_string(),
                days_overdue: None,
                days_until_eligible: None,
            });
        }

        let still_owing = matches!(
            InvoiceStatus::from_str(&invoice.status),
            Some(InvoiceStatus::Unpaid) | Some(InvoiceStatus::Overdue)
        );
        if !still_owing {
            return Ok(LateFeeEligibility {
                eligible: false,
                reason: format!("invoice status is {}", invoice.status),
                days_overdue: None,
                days_until_eligible: None,
            });
        }

        let pricing = self.pricing().await;
        let days_overdue = (now - invoice.due_date).num_days();

        if invoice.due_date < now - Duration::days(pricing.grace_period_days) {
            Ok(LateFeeEligibility {
                eligible: true,
                reason: "grace period elapsed".to_string(),
                days_overdue: Some(days_overdue),
                days_until_eligible: None,
            })
        } else {
            Ok(LateFeeEligibility {
                eligible: false,
                reason: "still within grace period".to_string(),
                days_overdue: Some(days_overdue.max(0)),
                days_until_eligible: Some((pricing.grace_period_days - days_overdue).max(0)),
            })
        }
    }

    async fn pricing(&self) -> PricingConfig {
        match self.pricing_repo.get_pricing_config().await {
            Ok(Some(config)) => config,
            Ok(None) => PricingConfig::default(),
            Err(err) => {
                warn!(error = ?err, "late_fees: pricing config unavailable, using defaults");
                PricingConfig::default()
            }
        }
    }
}
