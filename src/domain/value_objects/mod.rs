pub mod balances;
pub mod enums;
pub mod invoices;
pub mod late_fees;
pub mod lifecycle;
pub mod payment_proofs;
pub mod pricing;
pub mod proof_submissions;
