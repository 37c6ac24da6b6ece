//! Stock movement rules and availability checks.

pub mod error;
pub mod movement;

pub use error::InventoryError;
pub use movement::{MovementDirection, MovementLine, check_availability, validate_line};
