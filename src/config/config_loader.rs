use anyhow::{Ok, Result};
use rust_decimal::Decimal;

use super::config_model::{Database, DotEnvyConfig, Ocr, Scheduler, Server, WalletProof};
use crate::application::usecases::{
    lifecycle::{DEFAULT_CANCEL_AFTER_SUSPENSION_DAYS, DEFAULT_ENHANCED_REACTIVATION_DAYS},
    proof_verification::DEFAULT_EXTRACTION_TIMEOUT_SECS,
};

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;
const DEFAULT_AMOUNT_TOLERANCE: &str = "1.00";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .unwrap_or_else(|_| "90".to_string())
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let wallet = WalletProof {
        expected_account: std::env::var("WALLET_EXPECTED_ACCOUNT")
            .expect("WALLET_EXPECTED_ACCOUNT is invalid"),
        min_amount: std::env::var("WALLET_MIN_AMOUNT")
            .ok()
            .map(|value| value.parse::<Decimal>())
            .transpose()?,
        amount_tolerance: std::env::var("WALLET_AMOUNT_TOLERANCE")
            .unwrap_or_else(|_| DEFAULT_AMOUNT_TOLERANCE.to_string())
            .parse()?,
        extraction_timeout_secs: std::env::var("OCR_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_EXTRACTION_TIMEOUT_SECS.to_string())
            .parse()?,
    };

    let ocr = Ocr {
        base_url: std::env::var("OCR_BASE_URL").expect("OCR_BASE_URL is invalid"),
    };

    let scheduler = Scheduler {
        sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse()?,
        cancel_after_suspension_days: std::env::var("CANCEL_AFTER_SUSPENSION_DAYS")
            .unwrap_or_else(|_| DEFAULT_CANCEL_AFTER_SUSPENSION_DAYS.to_string())
            .parse()?,
        enhanced_reactivation_days: std::env::var("ENHANCED_REACTIVATION_DAYS")
            .unwrap_or_else(|_| DEFAULT_ENHANCED_REACTIVATION_DAYS.to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        wallet,
        ocr,
        scheduler,
    })
}
