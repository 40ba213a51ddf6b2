use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::verification_statuses::VerificationStatus;

pub const TOTAL_CHECKS: u32 = 4;
pub const AUTO_VERIFY_THRESHOLD: i32 = 90;
pub const REVIEW_THRESHOLD: i32 = 70;
pub const REJECT_INVALID_BELOW: i32 = 50;
pub const MIN_REFERENCE_LEN: usize = 6;
pub const MAX_REFERENCE_LEN: usize = 25;

// Wallet receipts show numbers as `0917 123 4567`, `0917-123-4567` or
// `+63 917 123 4567`; all are the same account.
static ACCOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?63[\s\-.]?9\d{2}[\s\-.]?\d{3}[\s\-.]?\d{4})\b|\b(09\d{2}[\s\-.]?\d{3}[\s\-.]?\d{4})\b")
        .unwrap()
});

static KEYED_AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:amount|total|payment|paid)\b[a-z ]*[:\-]?\s*(?:php|₱|p)?\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)")
        .unwrap()
});

static CURRENCY_AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:php|₱)\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)").unwrap());

static DECIMAL_AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{1,3}(?:,[0-9]{3})*\.[0-9]{2})\b").unwrap());

// Reference tokens are often printed in spaced or dashed groups.
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bref(?:erence)?\s*(?:no|number|id)?\s*[.:#]?\s*([A-Za-z0-9]+(?:[ \-][0-9]{1,6})*)")
        .unwrap()
});

// Many wallets print a bare 13-digit transaction reference with no label.
static BARE_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{13})\b").unwrap());

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}\b|\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b\d{4}-\d{2}-\d{2}\b",
    )
    .unwrap()
});

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?\s*(?:am|pm)?\b").unwrap());

static RECIPIENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:sent to|paid to|recipient)\s*[:\-]?\s+([A-Za-z][A-Za-z .'\-]{1,48})")
        .unwrap()
});

/// Collapses every equivalent wallet-account rendering to the canonical
/// local `09XXXXXXXXX` form before comparison.
pub fn normalize_wallet_account(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 12 && digits.starts_with("63") {
        format!("0{}", &digits[2..])
    } else if digits.len() == 10 && digits.starts_with('9') {
        format!("0{digits}")
    } else {
        digits
    }
}

/// Structured fields recovered from the raw receipt text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub recipient_name: Option<String>,
    pub account_numbers: Vec<String>,
    pub amounts: Vec<Decimal>,
    pub reference_number: Option<String>,
    pub timestamp_text: Option<String>,
}

impl ExtractedFields {
    pub fn parse(text: &str) -> Self {
        let recipient_name = RECIPIENT_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string());

        let mut account_numbers = Vec::new();
        for caps in ACCOUNT_RE.captures_iter(text) {
            let raw = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let canonical = normalize_wallet_account(raw);
            if !canonical.is_empty() && !account_numbers.contains(&canonical) {
                account_numbers.push(canonical);
            }
        }

        let mut amounts = Vec::new();
        for re in [&*KEYED_AMOUNT_RE, &*CURRENCY_AMOUNT_RE, &*DECIMAL_AMOUNT_RE] {
            for caps in re.captures_iter(text) {
                if let Some(amount) = caps.get(1).and_then(|m| parse_amount(m.as_str())) {
                    if !amounts.contains(&amount) {
                        amounts.push(amount);
                    }
                }
            }
        }

        let reference_number = REFERENCE_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().replace([' ', '-'], ""))
            .or_else(|| {
                BARE_REFERENCE_RE
                    .captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            });

        let timestamp_text = DATE_RE
            .find(text)
            .or_else(|| TIME_RE.find(text))
            .map(|m| m.as_str().trim().to_string());

        Self {
            recipient_name,
            account_numbers,
            amounts,
            reference_number,
            timestamp_text,
        }
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str_exact(&raw.replace(',', "")).ok()
}

/// Expected-side parameters for proof evaluation. The expected account is
/// normalized once at construction.
#[derive(Debug, Clone)]
pub struct WalletProofPolicy {
    pub expected_account: String,
    pub min_amount: Option<Decimal>,
    pub amount_tolerance: Decimal,
}

impl WalletProofPolicy {
    pub fn new(expected_account: &str, min_amount: Option<Decimal>, amount_tolerance: Decimal) -> Self {
        Self {
            expected_account: normalize_wallet_account(expected_account),
            min_amount,
            amount_tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChecks {
    /// Critical: a parsed account number equals the configured account.
    pub account_matches: bool,
    /// Critical: a parsed amount covers the minimum or lands within
    /// tolerance of the expected amount.
    pub amount_valid: bool,
    pub reference_plausible: bool,
    pub timestamp_present: bool,
}

impl VerificationChecks {
    pub fn passed(&self) -> u32 {
        [
            self.account_matches,
            self.amount_valid,
            self.reference_plausible,
            self.timestamp_present,
        ]
        .iter()
        .filter(|check| **check)
        .count() as u32
    }

    pub fn critical_passed(&self) -> bool {
        self.account_matches && self.amount_valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationDecision {
    AutoVerified,
    NeedsReview,
    AutoRejected,
}

impl VerificationDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationDecision::AutoVerified => "auto_verified",
            VerificationDecision::NeedsReview => "needs_review",
            VerificationDecision::AutoRejected => "auto_rejected",
        }
    }
}

impl From<VerificationDecision> for VerificationStatus {
    fn from(decision: VerificationDecision) -> Self {
        match decision {
            VerificationDecision::AutoVerified => VerificationStatus::AutoVerified,
            VerificationDecision::NeedsReview => VerificationStatus::NeedsReview,
            VerificationDecision::AutoRejected => VerificationStatus::AutoRejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub fields: ExtractedFields,
    pub checks: VerificationChecks,
    pub confidence: i32,
    pub is_valid: bool,
    pub decision: VerificationDecision,
}

/// Deterministic multi-factor evaluation of one receipt text against one
/// expected amount. Confidence alone can never promote a submission whose
/// critical checks failed.
pub fn evaluate_proof(
    text: &str,
    expected_amount: Decimal,
    policy: &WalletProofPolicy,
) -> VerificationReport {
    let fields = ExtractedFields::parse(text);

    let min_required = policy.min_amount.unwrap_or(expected_amount);
    let checks = VerificationChecks {
        account_matches: fields
            .account_numbers
            .iter()
            .any(|account| *account == policy.expected_account),
        amount_valid: fields.amounts.iter().any(|amount| {
            *amount >= min_required
                || (*amount - expected_amount).abs() <= policy.amount_tolerance
        }),
        reference_plausible: fields
            .reference_number
            .as_ref()
            .map(|reference| {
                (MIN_REFERENCE_LEN..=MAX_REFERENCE_LEN).contains(&reference.len())
            })
            .unwrap_or(false),
        timestamp_present: fields.timestamp_text.is_some(),
    };

    let confidence = (checks.passed() * 100 / TOTAL_CHECKS) as i32;
    let is_valid = checks.critical_passed();

    VerificationReport {
        fields,
        checks,
        confidence,
        is_valid,
        decision: decide(is_valid, confidence),
    }
}

fn decide(is_valid: bool, confidence: i32) -> VerificationDecision {
    if !is_valid {
        if confidence >= REJECT_INVALID_BELOW {
            VerificationDecision::NeedsReview
        } else {
            VerificationDecision::AutoRejected
        }
    } else if confidence >= AUTO_VERIFY_THRESHOLD {
        VerificationDecision::AutoVerified
    } else if confidence >= REVIEW_THRESHOLD {
        VerificationDecision::NeedsReview
    } else {
        VerificationDecision::AutoRejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> WalletProofPolicy {
        WalletProofPolicy::new("09171234567", None, Decimal::new(100, 2))
    }

    fn expected() -> Decimal {
        Decimal::new(19900, 2)
    }

    #[test]
    fn normalizes_equivalent_account_formats() {
        for raw in ["09171234567", "0917 123 4567", "0917-123-4567", "+63 917 123 4567", "639171234567"] {
            assert_eq!(normalize_wallet_account(raw), "09171234567", "raw: {raw}");
        }
    }

    #[test]
    fn parses_full_receipt() {
        let text = "Sent to: JUAN DELA CRUZ\n\
                    +63 917 123 4567\n\
                    Amount PHP 199.00\n\
                    Ref No. 9015 3342 1178 8\n\
                    Jan 15, 2026 3:45 PM";

        let fields = ExtractedFields::parse(text);

        assert_eq!(fields.recipient_name.as_deref(), Some("JUAN DELA CRUZ"));
        assert_eq!(fields.account_numbers, vec!["09171234567".to_string()]);
        assert!(fields.amounts.contains(&Decimal::new(19900, 2)));
        assert_eq!(fields.reference_number.as_deref(), Some("9015334211788"));
        assert_eq!(fields.timestamp_text.as_deref(), Some("Jan 15, 2026"));
    }

    #[test]
    fn parses_amount_without_currency_marker() {
        let fields = ExtractedFields::parse("Total: 1,250.50");
        assert_eq!(fields.amounts, vec![Decimal::new(125050, 2)]);
    }

    #[test]
    fn picks_up_bare_thirteen_digit_reference() {
        let fields = ExtractedFields::parse("Transaction 9015334211788 completed");
        assert_eq!(fields.reference_number.as_deref(), Some("9015334211788"));
    }

    #[test]
    fn correct_receipt_is_auto_verified_at_full_confidence() {
        let text = "Sent to: JUAN DELA CRUZ\n\
                    0917 123 4567\n\
                    Amount: 199.00\n\
                    Ref No. 9015334211788\n\
                    01/15/2026 15:45";

        let report = evaluate_proof(text, expected(), &policy());

        assert!(report.is_valid);
        assert_eq!(report.confidence, 100);
        assert_eq!(report.decision, VerificationDecision::AutoVerified);
    }

    #[test]
    fn wrong_account_is_never_auto_verified() {
        let text = "Sent to: JUAN DELA CRUZ\n\
                    0999 888 7777\n\
                    Amount: 199.00\n\
                    Ref No. 9015334211788\n\
                    01/15/2026 15:45";

        let report = evaluate_proof(text, expected(), &policy());

        assert!(!report.checks.account_matches);
        assert!(!report.is_valid);
        assert_eq!(report.confidence, 75);
        assert_eq!(report.decision, VerificationDecision::NeedsReview);
    }

    #[test]
    fn garbage_text_is_auto_rejected() {
        let report = evaluate_proof("nothing useful here", expected(), &policy());

        assert!(!report.is_valid);
        assert_eq!(report.confidence, 0);
        assert_eq!(report.decision, VerificationDecision::AutoRejected);
    }

    #[test]
    fn amount_within_tolerance_passes() {
        let text = "0917 123 4567\nAmount: 198.50\nRef No. 9015334211788\n01/15/2026";
        let report = evaluate_proof(text, expected(), &policy());

        assert!(report.checks.amount_valid);
        assert_eq!(report.decision, VerificationDecision::AutoVerified);
    }

    #[test]
    fn short_reference_is_not_plausible() {
        let text = "0917 123 4567\nAmount: 199.00\nRef: 123\n01/15/2026";
        let report = evaluate_proof(text, expected(), &policy());

        assert!(!report.checks.reference_plausible);
        assert_eq!(report.confidence, 75);
        assert_eq!(report.decision, VerificationDecision::NeedsReview);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let text = "0917 123 4567\nAmount: 199.00\nRef No. 9015334211788\n01/15/2026";

        let first = evaluate_proof(text, expected(), &policy());
        let second = evaluate_proof(text, expected(), &policy());

        assert_eq!(first, second);
    }
}
