pub mod invoice_generation;
pub mod late_fees;
pub mod ledger;
pub mod lifecycle;
pub mod proof_verification;
