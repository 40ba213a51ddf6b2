pub mod billing_frequencies;
pub mod invoice_statuses;
pub mod invoice_types;
pub mod payment_statuses;
pub mod subscription_statuses;
pub mod verification_statuses;
