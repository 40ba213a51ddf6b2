use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Subscription,
    Reactivation,
    Adjustment,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Subscription => "subscription",
            InvoiceType::Reactivation => "reactivation",
            InvoiceType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "subscription" => Some(InvoiceType::Subscription),
            "reactivation" => Some(InvoiceType::Reactivation),
            "adjustment" => Some(InvoiceType::Adjustment),
            _ => None,
        }
    }
}

impl Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
