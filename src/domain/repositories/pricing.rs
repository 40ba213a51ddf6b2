use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::pricing::PricingConfig;

/// Configuration collaborator. Callers fall back to
/// `PricingConfig::default()` when no record is available.
#[async_trait]
#[automock]
pub trait PricingConfigRepository {
    async fn get_pricing_config(&self) -> Result<Option<PricingConfig>>;
}
