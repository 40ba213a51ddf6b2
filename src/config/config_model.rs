use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub wallet: WalletProof,
    pub ocr: Ocr,
    pub scheduler: Scheduler,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

/// Expected-side parameters for mobile-wallet proof verification.
#[derive(Debug, Clone)]
pub struct WalletProof {
    pub expected_account: String,
    pub min_amount: Option<Decimal>,
    pub amount_tolerance: Decimal,
    pub extraction_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Ocr {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    pub sweep_interval_secs: u64,
    pub cancel_after_suspension_days: i64,
    pub enhanced_reactivation_days: i64,
}
