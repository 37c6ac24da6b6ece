//! Document number generation and parsing.

pub mod document_number;

pub use document_number::{
    INVOICE_PREFIX, MAX_DAY_COUNTER, invoice_day_prefix, next_invoice_number,
    sale_record_number, stock_record_number, voucher_for_invoice, voucher_for_order,
};
