use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::entities::{invoices::InvoiceEntity, payments::PaymentEntity};

/// Derived ledger position for one customer. Negative balance means the
/// customer holds credit; positive means the customer owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub balance: Decimal,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
}

impl BalanceSummary {
    pub fn zero() -> Self {
        Self {
            balance: Decimal::ZERO,
            total_billed: Decimal::ZERO,
            total_paid: Decimal::ZERO,
        }
    }

    pub fn has_credit(&self) -> bool {
        self.balance < Decimal::ZERO
    }
}

/// balance = Σ invoice.amount − Σ payment.amount, always.
pub fn summarize(invoices: &[InvoiceEntity], payments: &[PaymentEntity]) -> BalanceSummary {
    let total_billed: Decimal = invoices.iter().map(|invoice| invoice.amount).sum();
    let total_paid: Decimal = payments.iter().map(|payment| payment.amount).sum();

    BalanceSummary {
        balance: total_billed - total_paid,
        total_billed,
        total_paid,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditSplit {
    pub original_amount: Decimal,
    pub credit_applied: Decimal,
    pub final_amount: Decimal,
}

/// Consumes available credit (a negative balance) against a new charge.
/// `credit_applied` never exceeds the base amount or the credit held, and
/// the final amount never goes below zero.
pub fn apply_credit(base_amount: Decimal, balance: Decimal) -> CreditSplit {
    let credit_available = if balance < Decimal::ZERO {
        -balance
    } else {
        Decimal::ZERO
    };
    let credit_applied = credit_available.min(base_amount);

    CreditSplit {
        original_amount: base_amount,
        credit_applied,
        final_amount: (base_amount - credit_applied).max(Decimal::ZERO),
    }
}
