use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    application::errors::{BillingError, BillingResult},
    domain::{
        repositories::{
            customers::CustomerRepository, invoices::InvoiceRepository,
            payments::PaymentRepository,
        },
        value_objects::balances::{self, BalanceSummary},
    },
};

/// Derives a customer's running balance from stored invoices (debits) and
/// payments (credits). Pure read; callers that write based on the result
/// must do so through the storage layer's transactional paths.
pub struct LedgerUseCase<C, I, P>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    customer_repo: Arc<C>,
    invoice_repo: Arc<I>,
    payment_repo: Arc<P>,
}

impl<C, I, P> LedgerUseCase<C, I, P>
where
    C: CustomerRepository + Send + Sync + 'static,
    I: InvoiceRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    pub fn new(customer_repo: Arc<C>, invoice_repo: Arc<I>, payment_repo: Arc<P>) -> Self {
        Self {
            customer_repo,
            invoice_repo,
            payment_repo,
        }
    }

    pub async fn compute_balance(&self, customer_id: Uuid) -> BillingResult<BalanceSummary> {
        let customer = self
            .customer_repo
            .find_by_id(customer_id)
            .await
            .map_err(BillingError::Internal)?;

        if customer.is_none() {
            return Err(BillingError::Validation(format!(
                "unknown customer reference: {customer_id}"
            )));
        }

        let invoices = self
            .invoice_repo
            .list_active_by_customer(customer_id)
            .await
            .map_err(|err| {
                error!(%customer_id, db_error = ?err, "ledger: failed to load invoices");
                BillingError::Internal(err)
            })?;

        for invoice in &invoices {
            if invoice.amount < Decimal::ZERO {
                error!(
                    %customer_id,
                    invoice_id = %invoice.id,
                    amount = %invoice.amount,
                    "ledger: stored invoice amount below zero"
                );
                return Err(BillingError::DataIntegrity(format!(
                    "invoice {} has negative amount {}",
                    invoice.id, invoice.amount
                )));
            }
            if invoice.credit_applied > invoice.original_amount {
                error!(
                    %customer_id,
                    invoice_id = %invoice.id,
                    credit_applied = %invoice.credit_applied,
                    original_amount = %invoice.original_amount,
                    "ledger: credit applied exceeds original amount"
                );
                return Err(BillingError::DataIntegrity(format!(
                    "invoice {} credit {} exceeds original {}",
                    invoice.id, invoice.credit_applied, invoice.original_amount
                )));
            }
        }

        let payments = self
            .payment_repo
            .list_active_by_customer(customer_id)
            .await
            .map_err(|err| {
                error!(%customer_id, db_error = ?err, "ledger: failed to load payments");
                BillingError::Internal(err)
            })?;

        let summary = balances::summarize(&invoices, &payments);
        debug!(
            %customer_id,
            balance = %summary.balance,
            total_billed = %summary.total_billed,
            total_paid = %summary.total_paid,
            "ledger: balance computed"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;

    use crate::domain::{
        entities::{
            customers::CustomerEntity, invoices::InvoiceEntity, payments::PaymentEntity,
        },
        repositories::{
            customers::MockCustomerRepository, invoices::MockInvoiceRepository,
            payments::MockPaymentRepository,
        },
    };

    fn sample_customer(id: Uuid) -> CustomerEntity {
        CustomerEntity {
            id,
            display_name: Some("Customer".to_string()),
            email: None,
            wallet_account: None,
            status: "active".to_string(),
            created_at: Utc::now(),
        }
    }

    fn sample_invoice(customer_id: Uuid, amount: Decimal) -> InvoiceEntity {
        InvoiceEntity {
            id: Uuid::new_v4(),
            invoice_number: "INV-20260115-AAAAAA".to_string(),
            subscription_id: Uuid::new_v4(),
            customer_id,
            invoice_type: "subscription".to_string(),
            original_amount: amount,
            credit_applied: Decimal::ZERO,
            amount,
            status: "unpaid".to_string(),
            due_date: Utc::now(),
            generated_date: Utc::now().date_naive(),
            late_fee_applied: false,
            late_fee_amount: Decimal::ZERO,
            archived: false,
            notes: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    fn sample_payment(customer_id: Uuid, amount: Decimal) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            customer_id,
            amount,
            method: "mobile_wallet".to_string(),
            reference: None,
            paid_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    fn usecase(
        customer_repo: MockCustomerRepository,
        invoice_repo: MockInvoiceRepository,
        payment_repo: MockPaymentRepository,
    ) -> LedgerUseCase<MockCustomerRepository, MockInvoiceRepository, MockPaymentRepository> {
        LedgerUseCase::new(
            Arc::new(customer_repo),
            Arc::new(invoice_repo),
            Arc::new(payment_repo),
        )
    }

    #[tokio::test]
    async fn customer_without_invoices_has_zero_balance() {
        let customer_id = Uuid::new_v4();

        let mut customer_repo = MockCustomerRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();
        let mut payment_repo = MockPaymentRepository::new();

        customer_repo
            .expect_find_by_id()
            .with(eq(customer_id))
            .returning(move |id| Box::pin(async move { Ok(Some(sample_customer(id))) }));
        invoice_repo
            .expect_list_active_by_customer()
            .returning(|_| Box::pin(async { Ok(vec![]) }));
        payment_repo
            .expect_list_active_by_customer()
            .returning(|_| Box::pin(async { Ok(vec![]) }));

        let summary = usecase(customer_repo, invoice_repo, payment_repo)
            .compute_balance(customer_id)
            .await
            .unwrap();

        assert_eq!(summary.balance, Decimal::ZERO);
        assert_eq!(summary.total_billed, Decimal::ZERO);
        assert_eq!(summary.total_paid, Decimal::ZERO);
    }

    #[tokio::test]
    async fn balance_is_invoices_minus_payments() {
        let customer_id = Uuid::new_v4();

        let mut customer_repo = MockCustomerRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();
        let mut payment_repo = MockPaymentRepository::new();

        customer_repo
            .expect_find_by_id()
            .returning(move |id| Box::pin(async move { Ok(Some(sample_customer(id))) }));
        invoice_repo.expect_list_active_by_customer().returning(move |id| {
            Box::pin(async move {
                Ok(vec![
                    sample_invoice(id, Decimal::new(19900, 2)),
                    sample_invoice(id, Decimal::new(24900, 2)),
                ])
            })
        });
        payment_repo.expect_list_active_by_customer().returning(move |id| {
            Box::pin(async move { Ok(vec![sample_payment(id, Decimal::new(19900, 2))]) })
        });

        let summary = usecase(customer_repo, invoice_repo, payment_repo)
            .compute_balance(customer_id)
            .await
            .unwrap();

        assert_eq!(summary.total_billed, Decimal::new(44800, 2));
        assert_eq!(summary.total_paid, Decimal::new(19900, 2));
        assert_eq!(summary.balance, Decimal::new(24900, 2));
    }

    #[tokio::test]
    async fn unknown_customer_is_a_validation_error() {
        let mut customer_repo = MockCustomerRepository::new();
        let invoice_repo = MockInvoiceRepository::new();
        let payment_repo = MockPaymentRepository::new();

        customer_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let error = usecase(customer_repo, invoice_repo, payment_repo)
            .compute_balance(Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(error, BillingError::Validation(_)));
    }

    #[tokio::test]
    async fn negative_stored_amount_is_a_data_integrity_error() {
        let customer_id = Uuid::new_v4();

        let mut customer_repo = MockCustomerRepository::new();
        let mut invoice_repo = MockInvoiceRepository::new();
        let payment_repo = MockPaymentRepository::new();

        customer_repo
            .expect_find_by_id()
            .returning(move |id| Box::pin(async move { Ok(Some(sample_customer(id))) }));
        invoice_repo.expect_list_active_by_customer().returning(move |id| {
            Box::pin(async move { Ok(vec![sample_invoice(id, Decimal::new(-100, 2))]) })
        });

        let error = usecase(customer_repo, invoice_repo, payment_repo)
            .compute_balance(customer_id)
            .await
            .unwrap_err();

        assert!(matches!(error, BillingError::DataIntegrity(_)));
    }
}
