//! Inventory error types.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by stock movement checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// Requested quantity exceeds the available stock.
    #[error(
        "Insufficient stock for product {product_code}. Available: {available}, requested: {requested}"
    )]
    InsufficientStock {
        /// Product code shown to the operator.
        product_code: String,
        /// Stock available at check time.
        available: Decimal,
        /// Quantity that was requested.
        requested: Decimal,
    },

    /// Line quantity must be strictly positive.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Product not found (or soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),
}

impl InventoryError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InsufficientStock { .. } => 422,
            Self::InvalidQuantity(_) => 400,
            Self::ProductNotFound(_) => 404,
        }
    }
}
