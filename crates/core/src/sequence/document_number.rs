//! Human-readable document numbers.
//!
//! Two schemes exist:
//!
//! - Sequential: `INV-YYYYMMDD-NNNN`, a day-scoped 4-digit counter. The
//!   next number is derived from the greatest existing number for the day
//!   prefix; uniqueness under concurrency is enforced by the database's
//!   unique index, surfaced to callers as a retryable conflict.
//! - Random: `ST-IN-`/`ST-OUT-` record numbers with a random suffix,
//!   where global uniqueness matters but order does not. Collisions are
//!   regenerated before insert.

use chrono::NaiveDate;
use uuid::Uuid;

/// Prefix of sequential sales invoice numbers.
pub const INVOICE_PREFIX: &str = "INV-";

/// The day counter saturates at 9999; the format has four digits.
pub const MAX_DAY_COUNTER: u32 = 9999;

/// Day prefix for sequential invoice numbers: `INV-YYYYMMDD-`.
#[must_use]
pub fn invoice_day_prefix(date: NaiveDate) -> String {
    format!("{INVOICE_PREFIX}{}-", date.format("%Y%m%d"))
}

/// Next invoice number for a day, given the greatest existing number
/// sharing the day prefix (lexicographic max equals numeric max because
/// the counter is zero-padded).
///
/// Parses the trailing 4 digits of `last`, increments, clamps to
/// `[1, 9999]`, and zero-pads. An unparseable or absent `last` restarts
/// the day at 0001.
#[must_use]
pub fn next_invoice_number(date: NaiveDate, last: Option<&str>) -> String {
    let prefix = invoice_day_prefix(date);

    let next = last
        .and_then(|n| {
            // `get` rejects a split inside a multi-byte character, so a
            // non-ASCII tail falls back to restarting the day.
            let digits = n.len().checked_sub(4).and_then(|start| n.get(start..))?;
            digits.parse::<u32>().ok()
        })
        .map_or(1, |seq| seq + 1)
        .clamp(1, MAX_DAY_COUNTER);

    format!("{prefix}{next:04}")
}

/// Record number for a manual stock movement: `ST-IN-<suffix>` or
/// `ST-OUT-<suffix>` with an 8-character random suffix.
#[must_use]
pub fn stock_record_number(prefix: &str, suffix_source: Uuid) -> String {
    let hex = suffix_source.simple().to_string();
    format!("{prefix}{}", &hex[..8])
}

/// Record number for an invoice-driven stock movement:
/// `ST-OUT-<invoiceNo>-<suffix>` (or `ST-IN-` for returns).
#[must_use]
pub fn sale_record_number(is_return: bool, invoice_number: &str, suffix_source: Uuid) -> String {
    let direction = if is_return { "IN" } else { "OUT" };
    let hex = suffix_source.simple().to_string();
    format!("ST-{direction}-{invoice_number}-{}", &hex[..8])
}

/// Voucher number for a sale posting: `VOU-` plus the invoice number
/// without its `INV-` prefix.
#[must_use]
pub fn voucher_for_invoice(invoice_number: &str) -> String {
    let stripped = invoice_number
        .strip_prefix(INVOICE_PREFIX)
        .unwrap_or(invoice_number);
    format!("VOU-{stripped}")
}

/// Voucher number for a purchase receipt posting: `PO-` plus the order
/// number.
#[must_use]
pub fn voucher_for_order(order_number: &str) -> String {
    format!("PO-{order_number}")
}
