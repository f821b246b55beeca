//! Invoice ledger arithmetic and payment-state rules.
//!
//! All derived figures (subtotal, tax, total, balance) are recomputed from
//! authoritative stored rows on every write; nothing is cached incrementally.

use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::{CreateLineItem, InvoiceStatus};

/// Derived invoice figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

/// Compute invoice totals from its line items.
///
/// subtotal = sum(quantity * unit_price); tax applies to the subtotal after
/// discount; total = subtotal - discount + tax.
pub fn compute_totals(
    line_items: &[CreateLineItem],
    discount: Decimal,
    tax_rate: Option<Decimal>,
) -> InvoiceTotals {
    let subtotal: Decimal = line_items
        .iter()
        .map(|li| (li.quantity * li.unit_price).round_dp(2))
        .sum();

    let after_discount = (subtotal - discount).max(Decimal::ZERO);
    let tax_total = match tax_rate {
        Some(rate) => (after_discount * rate).round_dp(2),
        None => Decimal::ZERO,
    };

    InvoiceTotals {
        subtotal,
        tax_total,
        total: after_discount + tax_total,
    }
}

/// Outstanding balance, clamped to zero.
pub fn balance_due(total: Decimal, amount_paid: Decimal) -> Decimal {
    (total - amount_paid).max(Decimal::ZERO)
}

/// Validate a payment before any write.
pub fn validate_payment(
    status: InvoiceStatus,
    amount: Decimal,
    balance: Decimal,
) -> Result<(), AppError> {
    if !status.is_payable() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invoice is not payable in status '{}'",
            status.as_str()
        )));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment amount must be positive"
        )));
    }
    if amount > balance {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment amount {} exceeds balance due {}",
            amount,
            balance
        )));
    }
    Ok(())
}

/// Validate a payment removal. A cancelled invoice is terminal and keeps
/// whatever payments it carried; its ledger is frozen.
pub fn validate_payment_removal(status: InvoiceStatus) -> Result<(), AppError> {
    if status == InvoiceStatus::Cancelled {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payments cannot be removed from a cancelled invoice"
        )));
    }
    Ok(())
}

/// Status after recording a payment: paid when settled, else partial.
pub fn status_after_payment(total: Decimal, amount_paid: Decimal) -> InvoiceStatus {
    if balance_due(total, amount_paid) == Decimal::ZERO {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}

/// Status after removing a payment. Prior status is not recorded, so when
/// the paid amount returns to zero this is a documented approximation:
/// viewed if the invoice was ever viewed, else sent.
pub fn status_after_removal(amount_paid: Decimal, was_viewed: bool) -> InvoiceStatus {
    if amount_paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else if was_viewed {
        InvoiceStatus::Viewed
    } else {
        InvoiceStatus::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(quantity: &str, unit_price: &str) -> CreateLineItem {
        CreateLineItem {
            description: "coaching session".to_string(),
            quantity: d(quantity),
            unit_price: d(unit_price),
        }
    }

    #[test]
    fn totals_without_tax_or_discount() {
        let totals = compute_totals(&[item("2", "150.00"), item("1", "75.50")], Decimal::ZERO, None);
        assert_eq!(totals.subtotal, d("375.50"));
        assert_eq!(totals.tax_total, d("0"));
        assert_eq!(totals.total, d("375.50"));
    }

    #[test]
    fn tax_applies_after_discount() {
        let totals = compute_totals(&[item("1", "100.00")], d("20.00"), Some(d("0.10")));
        assert_eq!(totals.subtotal, d("100.00"));
        assert_eq!(totals.tax_total, d("8.00"));
        assert_eq!(totals.total, d("88.00"));
    }

    #[test]
    fn discount_cannot_push_total_negative() {
        let totals = compute_totals(&[item("1", "50.00")], d("80.00"), Some(d("0.10")));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn balance_is_clamped_to_zero() {
        assert_eq!(balance_due(d("100.00"), d("40.00")), d("60.00"));
        assert_eq!(balance_due(d("100.00"), d("100.00")), Decimal::ZERO);
        assert_eq!(balance_due(d("100.00"), d("120.00")), Decimal::ZERO);
    }

    #[test]
    fn rejects_payment_over_balance() {
        let err = validate_payment(InvoiceStatus::Sent, d("60.00"), d("50.00"));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_positive_payment() {
        assert!(validate_payment(InvoiceStatus::Sent, d("0.00"), d("50.00")).is_err());
        assert!(validate_payment(InvoiceStatus::Sent, d("-1.00"), d("50.00")).is_err());
    }

    #[test]
    fn rejects_payment_on_draft_and_cancelled() {
        assert!(validate_payment(InvoiceStatus::Draft, d("10.00"), d("50.00")).is_err());
        assert!(validate_payment(InvoiceStatus::Cancelled, d("10.00"), d("50.00")).is_err());
        assert!(validate_payment(InvoiceStatus::Viewed, d("10.00"), d("50.00")).is_ok());
    }

    #[test]
    fn rejects_removal_on_cancelled() {
        assert!(validate_payment_removal(InvoiceStatus::Cancelled).is_err());
        assert!(validate_payment_removal(InvoiceStatus::Paid).is_ok());
        assert!(validate_payment_removal(InvoiceStatus::Partial).is_ok());
    }

    #[test]
    fn settling_payment_marks_paid() {
        assert_eq!(
            status_after_payment(d("100.00"), d("100.00")),
            InvoiceStatus::Paid
        );
        assert_eq!(
            status_after_payment(d("100.00"), d("40.00")),
            InvoiceStatus::Partial
        );
    }

    #[test]
    fn removal_reverts_to_best_guess_prior_status() {
        assert_eq!(
            status_after_removal(d("10.00"), true),
            InvoiceStatus::Partial
        );
        assert_eq!(status_after_removal(d("0"), true), InvoiceStatus::Viewed);
        assert_eq!(status_after_removal(d("0"), false), InvoiceStatus::Sent);
    }
}
