pub mod collection_jobs;
pub mod customers;
pub mod invoices;
pub mod payment_proofs;
pub mod payments;
pub mod plans;
pub mod subscriptions;
