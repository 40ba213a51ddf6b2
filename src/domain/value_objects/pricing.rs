use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Operator-tunable pricing knobs. Stored as a single JSONB record; the
/// defaults below are the documented fallback when the record is absent
/// or unreadable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    #[serde(default = "default_late_fee_amount")]
    pub late_fee_amount: Decimal,

    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,

    #[serde(default = "default_subscription_price")]
    pub subscription_price: Decimal,

    #[serde(default)]
    pub discounts: DiscountRates,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscountRates {
    #[serde(default)]
    pub annual_prepay: Decimal,

    #[serde(default)]
    pub loyalty: Decimal,
}

fn default_late_fee_amount() -> Decimal {
    Decimal::new(5000, 2)
}

fn default_grace_period_days() -> i64 {
    7
}

fn default_subscription_price() -> Decimal {
    Decimal::new(19900, 2)
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            late_fee_amount: default_late_fee_amount(),
            grace_period_days: default_grace_period_days(),
            subscription_price: default_subscription_price(),
            discounts: DiscountRates::default(),
        }
    }
}
