//! Core business logic for Tillbook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Double-entry posting rules and ledger reporting
//! - `inventory` - Stock movement rules and availability checks
//! - `sequence` - Document number generation and parsing
//! - `sales` - Invoice line and total arithmetic

pub mod inventory;
pub mod ledger;
pub mod sales;
pub mod sequence;
