use std::{sync::Arc, time::Duration};

use crate::{
    application::usecases::{
        invoice_generation::InvoiceGenerationUseCase,
        late_fees::LateFeeUseCase,
        ledger::LedgerUseCase,
        lifecycle::{LifecyclePolicy, LifecycleUseCase},
        proof_verification::ProofVerificationUseCase,
    },
    config::config_model::DotEnvyConfig,
    domain::value_objects::payment_proofs::WalletProofPolicy,
    infrastructure::{
        notifications::log_notifier::LogNotifier,
        ocr::http_extractor::OcrHttpExtractor,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                collection_jobs::CollectionJobPostgres, customers::CustomerPostgres,
                invoices::InvoicePostgres, payment_proofs::PaymentProofPostgres,
                payments::PaymentPostgres, plans::PlanPostgres, pricing::PricingConfigPostgres,
                subscriptions::SubscriptionPostgres,
            },
        },
    },
};

pub type LedgerService = LedgerUseCase<CustomerPostgres, InvoicePostgres, PaymentPostgres>;
pub type InvoiceGenService = InvoiceGenerationUseCase<
    SubscriptionPostgres,
    InvoicePostgres,
    PlanPostgres,
    PricingConfigPostgres,
>;
pub type LateFeeService = LateFeeUseCase<InvoicePostgres, PricingConfigPostgres, LogNotifier>;
pub type LifecycleService = LifecycleUseCase<
    SubscriptionPostgres,
    InvoicePostgres,
    PlanPostgres,
    PricingConfigPostgres,
    LogNotifier,
    CollectionJobPostgres,
>;
pub type ProofService = ProofVerificationUseCase<
    PaymentProofPostgres,
    InvoicePostgres,
    PaymentPostgres,
    SubscriptionPostgres,
    OcrHttpExtractor,
    LogNotifier,
>;

/// One shared instance of every use case. The lifecycle service in
/// particular must be shared so its running flag covers both the
/// scheduler tick and the manual admin trigger.
pub struct BillingServices {
    pub ledger: Arc<LedgerService>,
    pub invoice_gen: Arc<InvoiceGenService>,
    pub late_fees: Arc<LateFeeService>,
    pub lifecycle: Arc<LifecycleService>,
    pub proofs: Arc<ProofService>,
}

pub fn build_services(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> BillingServices {
    let customer_repo = Arc::new(CustomerPostgres::new(Arc::clone(&db_pool)));
    let subscription_repo = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let invoice_repo = Arc::new(InvoicePostgres::new(Arc::clone(&db_pool)));
    let payment_repo = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let plan_repo = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let pricing_repo = Arc::new(PricingConfigPostgres::new(Arc::clone(&db_pool)));
    let proof_repo = Arc::new(PaymentProofPostgres::new(Arc::clone(&db_pool)));
    let collection_jobs = Arc::new(CollectionJobPostgres::new(Arc::clone(&db_pool)));

    let notifier = Arc::new(LogNotifier);
    let extractor = Arc::new(OcrHttpExtractor::new(config.ocr.base_url.clone()));

    let ledger = Arc::new(LedgerUseCase::new(
        customer_repo,
        Arc::clone(&invoice_repo),
        Arc::clone(&payment_repo),
    ));

    let invoice_gen = Arc::new(InvoiceGenerationUseCase::new(
        Arc::clone(&subscription_repo),
        Arc::clone(&invoice_repo),
        Arc::clone(&plan_repo),
        Arc::clone(&pricing_repo),
    ));

    let late_fees = Arc::new(LateFeeUseCase::new(
        Arc::clone(&invoice_repo),
        Arc::clone(&pricing_repo),
        Arc::clone(&notifier),
    ));

    let lifecycle = Arc::new(LifecycleUseCase::new(
        Arc::clone(&subscription_repo),
        Arc::clone(&invoice_repo),
        Arc::clone(&plan_repo),
        Arc::clone(&pricing_repo),
        Arc::clone(&notifier),
        collection_jobs,
        Arc::clone(&invoice_gen),
        LifecyclePolicy {
            cancel_after_suspension_days: config.scheduler.cancel_after_suspension_days,
            enhanced_reactivation_days: config.scheduler.enhanced_reactivation_days,
        },
    ));

    let proofs = Arc::new(ProofVerificationUseCase::new(
        proof_repo,
        Arc::clone(&invoice_repo),
        payment_repo,
        subscription_repo,
        extractor,
        notifier,
        WalletProofPolicy::new(
            &config.wallet.expected_account,
            config.wallet.min_amount,
            config.wallet.amount_tolerance,
        ),
        Duration::from_secs(config.wallet.extraction_timeout_secs),
    ));

    BillingServices {
        ledger,
        invoice_gen,
        late_fees,
        lifecycle,
        proofs,
    }
}
