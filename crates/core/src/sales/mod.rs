//! Invoice line and total arithmetic.

pub mod totals;

pub use totals::{InvoiceTotals, invoice_totals, line_total};
