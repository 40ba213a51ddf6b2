pub mod billing_admin;
pub mod payment_proofs;
