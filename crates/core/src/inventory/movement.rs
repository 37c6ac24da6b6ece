//! Stock movement direction and quantity rules.
//!
//! The persistence side (row locks, immutable movement records) lives in
//! the db crate; this module owns the arithmetic and the availability
//! check that decides whether an OUT movement may proceed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::InventoryError;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementDirection {
    /// Stock increases (purchases, returns).
    In,
    /// Stock decreases (sales, manual stock-out).
    Out,
}

impl MovementDirection {
    /// The stored transaction-type code.
    #[must_use]
    pub const fn type_code(self) -> &'static str {
        match self {
            Self::In => "STOCK_IN",
            Self::Out => "STOCK_OUT",
        }
    }

    /// Record-number prefix for manual movements.
    #[must_use]
    pub const fn record_prefix(self) -> &'static str {
        match self {
            Self::In => "ST-IN-",
            Self::Out => "ST-OUT-",
        }
    }

    /// Signed quantity change for a positive line quantity.
    #[must_use]
    pub fn signed_change(self, quantity: Decimal) -> Decimal {
        match self {
            Self::In => quantity,
            Self::Out => -quantity,
        }
    }
}

/// One line of a stock movement.
#[derive(Debug, Clone)]
pub struct MovementLine {
    /// Product being moved.
    pub product_id: Uuid,
    /// Positive quantity; the direction supplies the sign.
    pub quantity: Decimal,
    /// Unit price at the time of the movement.
    pub price_at_transaction: Decimal,
    /// Unit of measure, when the caller overrides the product default.
    pub uom_id: Option<Uuid>,
}

/// Validates a movement line before any stock is touched.
///
/// # Errors
///
/// Returns `InventoryError::InvalidQuantity` for zero or negative
/// quantities.
pub fn validate_line(line: &MovementLine) -> Result<(), InventoryError> {
    if line.quantity <= Decimal::ZERO {
        return Err(InventoryError::InvalidQuantity(line.quantity));
    }
    Ok(())
}

/// Checks that an OUT movement fits in the available stock.
///
/// IN movements never fail this check. The caller must hold the
/// product's row lock so `available` cannot change underneath us.
///
/// # Errors
///
/// Returns `InventoryError::InsufficientStock` with the product code and
/// both quantities when the stock would go negative.
pub fn check_availability(
    direction: MovementDirection,
    product_code: &str,
    available: Decimal,
    requested: Decimal,
) -> Result<(), InventoryError> {
    if direction == MovementDirection::Out && available < requested {
        return Err(InventoryError::InsufficientStock {
            product_code: product_code.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(MovementDirection::In, dec!(5), dec!(5))]
    #[case(MovementDirection::Out, dec!(5), dec!(-5))]
    #[case(MovementDirection::Out, dec!(0.5), dec!(-0.5))]
    fn test_signed_change(
        #[case] direction: MovementDirection,
        #[case] qty: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(direction.signed_change(qty), expected);
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(MovementDirection::In.type_code(), "STOCK_IN");
        assert_eq!(MovementDirection::Out.type_code(), "STOCK_OUT");
    }

    #[test]
    fn test_validate_line_rejects_non_positive() {
        let mut line = MovementLine {
            product_id: Uuid::new_v4(),
            quantity: dec!(0),
            price_at_transaction: dec!(10),
            uom_id: None,
        };
        assert_eq!(
            validate_line(&line),
            Err(InventoryError::InvalidQuantity(dec!(0)))
        );
        line.quantity = dec!(-1);
        assert!(validate_line(&line).is_err());
        line.quantity = dec!(0.0001);
        assert!(validate_line(&line).is_ok());
    }

    #[test]
    fn test_out_exceeding_stock_fails() {
        let err = check_availability(MovementDirection::Out, "SKU-1", dec!(10), dec!(12))
            .unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                product_code: "SKU-1".into(),
                available: dec!(10),
                requested: dec!(12),
            }
        );
    }

    #[test]
    fn test_out_exact_stock_succeeds() {
        assert!(check_availability(MovementDirection::Out, "SKU-1", dec!(10), dec!(10)).is_ok());
    }

    #[test]
    fn test_in_ignores_stock_level() {
        assert!(check_availability(MovementDirection::In, "SKU-1", dec!(0), dec!(99)).is_ok());
    }
}
