//! Invoice total arithmetic.
//!
//! Header totals are derived sums of line totals and are recomputed
//! whenever items change; they are never stored independently of the
//! lines that produced them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived totals for an invoice or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Sum of all line totals.
    pub grand_total: Decimal,
    /// Grand total minus discount plus expenses.
    pub net_total: Decimal,
}

/// Line total: quantity times unit price.
#[must_use]
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    quantity * unit_price
}

/// Header totals from line totals, an additional discount, and
/// additional expenses: `net = grand - discount + expenses`.
#[must_use]
pub fn invoice_totals(
    line_totals: &[Decimal],
    additional_discount: Decimal,
    additional_expenses: Decimal,
) -> InvoiceTotals {
    let grand_total: Decimal = line_totals.iter().copied().sum();
    InvoiceTotals {
        grand_total,
        net_total: grand_total - additional_discount + additional_expenses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(3), dec!(25.50), dec!(76.50))]
    #[case(dec!(0.25), dec!(100), dec!(25.00))]
    #[case(dec!(1.5000), dec!(9.99), dec!(14.985000))]
    fn test_line_total(#[case] qty: Decimal, #[case] price: Decimal, #[case] expected: Decimal) {
        assert_eq!(line_total(qty, price), expected);
    }

    #[test]
    fn test_invoice_totals() {
        let totals = invoice_totals(&[dec!(100), dec!(50)], dec!(10), dec!(5));
        assert_eq!(totals.grand_total, dec!(150));
        assert_eq!(totals.net_total, dec!(145));
    }

    #[test]
    fn test_invoice_totals_no_adjustments() {
        let totals = invoice_totals(&[dec!(20)], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(totals.grand_total, dec!(20));
        assert_eq!(totals.net_total, dec!(20));
    }

    #[test]
    fn test_invoice_totals_discount_can_go_negative() {
        // An over-discounted draft nets below zero; completion-time rules
        // decide whether that is allowed, not the arithmetic.
        let totals = invoice_totals(&[dec!(10)], dec!(15), Decimal::ZERO);
        assert_eq!(totals.net_total, dec!(-5));
    }

    #[test]
    fn test_empty_invoice() {
        let totals = invoice_totals(&[], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(totals.grand_total, Decimal::ZERO);
        assert_eq!(totals.net_total, Decimal::ZERO);
    }
}
