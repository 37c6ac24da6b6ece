//! Ledger report calculations: running balance replay and trial balance.
//!
//! Reports never trust the cached account balance. They replay the
//! append-only entry log, which stays correct even if the cache drifts
//! under concurrency.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::BalanceSide;

/// One ledger entry as fetched for a report, in replay order.
///
/// Callers must supply entries ordered by `(transaction_date, seq)` where
/// `seq` is the insertion sequence; same-date entries replay in insertion
/// order so the running balance is deterministic.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// Entry id.
    pub entry_id: Uuid,
    /// Insertion sequence, monotonically increasing across the log.
    pub seq: i64,
    /// Voucher number.
    pub voucher_no: String,
    /// Business date.
    pub transaction_date: NaiveDate,
    /// Description.
    pub description: Option<String>,
    /// Debit amount (zero on credit rows).
    pub debit_amount: Decimal,
    /// Credit amount (zero on debit rows).
    pub credit_amount: Decimal,
}

/// A report row: the entry plus the running balance after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningBalanceRow {
    /// Entry id.
    pub entry_id: Uuid,
    /// Voucher number.
    pub voucher_no: String,
    /// Business date.
    pub transaction_date: NaiveDate,
    /// Description.
    pub description: Option<String>,
    /// Debit amount.
    pub debit_amount: Decimal,
    /// Credit amount.
    pub credit_amount: Decimal,
    /// Running balance magnitude after this entry.
    pub running_balance: Decimal,
    /// Side of the running balance.
    pub balance_type: BalanceSide,
}

/// A complete ledger report for one account and date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerReport {
    /// Opening balance magnitude (entries strictly before the range).
    pub opening_balance: Decimal,
    /// Side of the opening balance.
    pub opening_balance_type: BalanceSide,
    /// Rows for the requested page only.
    pub entries: Vec<RunningBalanceRow>,
    /// Sum of debits within the range.
    pub total_debit: Decimal,
    /// Sum of credits within the range.
    pub total_credit: Decimal,
    /// Closing balance magnitude.
    pub closing_balance: Decimal,
    /// Side of the closing balance.
    pub closing_balance_type: BalanceSide,
    /// Total rows across all pages.
    pub total_elements: u64,
    /// Total pages.
    pub total_pages: u64,
    /// The page these rows belong to (0-indexed).
    pub page: u64,
}

/// One account's net position on the trial balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account id.
    pub account_id: Uuid,
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Net debit (zero when the account nets to credit).
    pub debit: Decimal,
    /// Net credit (zero when the account nets to debit).
    pub credit: Decimal,
}

/// Trial balance: all non-zero accounts plus column totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Cut-off date.
    pub as_of_date: NaiveDate,
    /// Per-account rows, zero-sum accounts excluded.
    pub rows: Vec<TrialBalanceRow>,
    /// Grand total of the debit column.
    pub total_debit: Decimal,
    /// Grand total of the credit column.
    pub total_credit: Decimal,
}

/// Signed sum of a slice of entries: debits positive, credits negative.
#[must_use]
pub fn signed_sum(entries: &[ReportEntry]) -> Decimal {
    entries
        .iter()
        .map(|e| e.debit_amount - e.credit_amount)
        .sum()
}

/// Collapses a signed balance to a display magnitude plus side.
///
/// Zero displays as debit, matching the original books.
#[must_use]
pub fn split_magnitude(signed: Decimal) -> (Decimal, BalanceSide) {
    if signed >= Decimal::ZERO {
        (signed, BalanceSide::Debit)
    } else {
        (-signed, BalanceSide::Credit)
    }
}

/// Replays entries on top of a signed opening balance.
///
/// Returns one row per entry with the running balance after it, plus the
/// final signed balance.
#[must_use]
pub fn replay_running_balance(
    opening_signed: Decimal,
    entries: &[ReportEntry],
) -> (Vec<RunningBalanceRow>, Decimal) {
    let mut balance = opening_signed;
    let mut rows = Vec::with_capacity(entries.len());

    for entry in entries {
        balance += entry.debit_amount - entry.credit_amount;
        let (magnitude, side) = split_magnitude(balance);
        rows.push(RunningBalanceRow {
            entry_id: entry.entry_id,
            voucher_no: entry.voucher_no.clone(),
            transaction_date: entry.transaction_date,
            description: entry.description.clone(),
            debit_amount: entry.debit_amount,
            credit_amount: entry.credit_amount,
            running_balance: magnitude,
            balance_type: side,
        });
    }

    (rows, balance)
}

/// Slices an already-computed row list for one page.
///
/// Pagination happens after the whole period is replayed; the running
/// balance is stateful across the full sequence, so the underlying query
/// can never be paged.
#[must_use]
pub fn paginate<T: Clone>(rows: &[T], page: u64, size: u64) -> Vec<T> {
    let size = size.max(1) as usize;
    let from = (page as usize).saturating_mul(size).min(rows.len());
    let to = from.saturating_add(size).min(rows.len());
    rows[from..to].to_vec()
}

/// Builds a complete ledger report from the signed opening balance and
/// the full period's entries in replay order.
#[must_use]
pub fn build_report(
    opening_signed: Decimal,
    entries: &[ReportEntry],
    page: u64,
    size: u64,
) -> LedgerReport {
    let size = size.max(1);
    let (opening, opening_side) = split_magnitude(opening_signed);

    let total_debit: Decimal = entries.iter().map(|e| e.debit_amount).sum();
    let total_credit: Decimal = entries.iter().map(|e| e.credit_amount).sum();

    let (rows, closing_signed) = replay_running_balance(opening_signed, entries);
    let (closing, closing_side) = split_magnitude(closing_signed);

    let total_elements = rows.len() as u64;
    let total_pages = if total_elements == 0 {
        0
    } else {
        total_elements.div_ceil(size)
    };

    LedgerReport {
        opening_balance: opening,
        opening_balance_type: opening_side,
        entries: paginate(&rows, page, size),
        total_debit,
        total_credit,
        closing_balance: closing,
        closing_balance_type: closing_side,
        total_elements,
        total_pages,
        page,
    }
}

/// Builds a trial balance from per-account net sums.
///
/// Accounts whose debit and credit are both zero are excluded; the rest
/// are totaled per column. For any valid entry log the two totals are
/// equal (the fundamental accounting identity).
#[must_use]
pub fn trial_balance(as_of_date: NaiveDate, rows: Vec<TrialBalanceRow>) -> TrialBalance {
    let rows: Vec<TrialBalanceRow> = rows
        .into_iter()
        .filter(|r| r.debit != Decimal::ZERO || r.credit != Decimal::ZERO)
        .collect();

    let total_debit: Decimal = rows.iter().map(|r| r.debit).sum();
    let total_credit: Decimal = rows.iter().map(|r| r.credit).sum();

    TrialBalance {
        as_of_date,
        rows,
        total_debit,
        total_credit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn entry(seq: i64, day: u32, debit: Decimal, credit: Decimal) -> ReportEntry {
        ReportEntry {
            entry_id: Uuid::new_v4(),
            seq,
            voucher_no: format!("VOU-{seq:04}"),
            transaction_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            description: None,
            debit_amount: debit,
            credit_amount: credit,
        }
    }

    #[test]
    fn test_split_magnitude() {
        assert_eq!(split_magnitude(dec!(70)), (dec!(70), BalanceSide::Debit));
        assert_eq!(split_magnitude(dec!(-30)), (dec!(30), BalanceSide::Credit));
        assert_eq!(split_magnitude(dec!(0)), (dec!(0), BalanceSide::Debit));
    }

    #[test]
    fn test_running_balance_replay() {
        // Opening 0, debit 100 on day 1, credit 30 on day 2:
        // rows are [100 Dr, 70 Dr], closing 70 Dr.
        let entries = vec![
            entry(1, 1, dec!(100), dec!(0)),
            entry(2, 2, dec!(0), dec!(30)),
        ];
        let (rows, closing) = replay_running_balance(Decimal::ZERO, &entries);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].running_balance, dec!(100));
        assert_eq!(rows[0].balance_type, BalanceSide::Debit);
        assert_eq!(rows[1].running_balance, dec!(70));
        assert_eq!(rows[1].balance_type, BalanceSide::Debit);
        assert_eq!(split_magnitude(closing), (dec!(70), BalanceSide::Debit));
    }

    #[test]
    fn test_running_balance_crosses_zero() {
        let entries = vec![
            entry(1, 1, dec!(40), dec!(0)),
            entry(2, 1, dec!(0), dec!(100)),
        ];
        let (rows, closing) = replay_running_balance(Decimal::ZERO, &entries);

        assert_eq!(rows[1].running_balance, dec!(60));
        assert_eq!(rows[1].balance_type, BalanceSide::Credit);
        assert_eq!(closing, dec!(-60));
    }

    #[test]
    fn test_replay_from_credit_opening() {
        let entries = vec![entry(1, 5, dec!(25), dec!(0))];
        let (rows, _) = replay_running_balance(dec!(-100), &entries);
        assert_eq!(rows[0].running_balance, dec!(75));
        assert_eq!(rows[0].balance_type, BalanceSide::Credit);
    }

    #[test]
    fn test_build_report_totals_cover_all_pages() {
        let entries = vec![
            entry(1, 1, dec!(100), dec!(0)),
            entry(2, 2, dec!(0), dec!(30)),
            entry(3, 3, dec!(10), dec!(0)),
        ];
        let report = build_report(Decimal::ZERO, &entries, 1, 2);

        // Page 1 holds only the third row, but totals span the period.
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.total_debit, dec!(110));
        assert_eq!(report.total_credit, dec!(30));
        assert_eq!(report.closing_balance, dec!(80));
        assert_eq!(report.closing_balance_type, BalanceSide::Debit);
        assert_eq!(report.total_elements, 3);
        assert_eq!(report.total_pages, 2);
    }

    #[test]
    fn test_build_report_empty_period() {
        let report = build_report(dec!(-40), &[], 0, 20);
        assert_eq!(report.opening_balance, dec!(40));
        assert_eq!(report.opening_balance_type, BalanceSide::Credit);
        assert_eq!(report.closing_balance, dec!(40));
        assert_eq!(report.closing_balance_type, BalanceSide::Credit);
        assert_eq!(report.total_pages, 0);
    }

    #[test]
    fn test_trial_balance_drops_zero_rows() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let rows = vec![
            TrialBalanceRow {
                account_id: Uuid::new_v4(),
                account_code: "CASH01".into(),
                account_name: "Cash".into(),
                debit: dec!(500),
                credit: dec!(0),
            },
            TrialBalanceRow {
                account_id: Uuid::new_v4(),
                account_code: "DORMANT".into(),
                account_name: "Dormant".into(),
                debit: dec!(0),
                credit: dec!(0),
            },
            TrialBalanceRow {
                account_id: Uuid::new_v4(),
                account_code: "REV001".into(),
                account_name: "Sales Revenue".into(),
                debit: dec!(0),
                credit: dec!(500),
            },
        ];
        let tb = trial_balance(date, rows);

        assert_eq!(tb.rows.len(), 2);
        assert_eq!(tb.total_debit, dec!(500));
        assert_eq!(tb.total_credit, dec!(500));
    }

    // ========================================================================
    // Property tests
    // ========================================================================

    /// Strategy for entry amounts in cents.
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// A period of entries: each is either a debit or a credit.
    fn entries_strategy(max_len: usize) -> impl Strategy<Value = Vec<ReportEntry>> {
        prop::collection::vec((amount_strategy(), any::<bool>()), 0..=max_len).prop_map(|v| {
            v.into_iter()
                .enumerate()
                .map(|(i, (amount, is_debit))| ReportEntry {
                    entry_id: Uuid::new_v4(),
                    seq: i as i64,
                    voucher_no: format!("VOU-{i:04}"),
                    transaction_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                    description: None,
                    debit_amount: if is_debit { amount } else { Decimal::ZERO },
                    credit_amount: if is_debit { Decimal::ZERO } else { amount },
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Closing balance always equals opening plus the signed period sum.
        #[test]
        fn prop_closing_equals_opening_plus_signed_sum(
            opening in -1_000_000i64..1_000_000i64,
            entries in entries_strategy(30),
        ) {
            let opening = Decimal::new(opening, 2);
            let (_, closing) = replay_running_balance(opening, &entries);
            prop_assert_eq!(closing, opening + signed_sum(&entries));
        }

        /// Every displayed running balance is non-negative.
        #[test]
        fn prop_running_magnitude_non_negative(
            entries in entries_strategy(30),
        ) {
            let (rows, _) = replay_running_balance(Decimal::ZERO, &entries);
            for row in rows {
                prop_assert!(row.running_balance >= Decimal::ZERO);
            }
        }

        /// Concatenating all pages reproduces the unpaginated sequence.
        #[test]
        fn prop_pagination_concatenation_is_identity(
            entries in entries_strategy(30),
            size in 1u64..10u64,
        ) {
            let (rows, _) = replay_running_balance(Decimal::ZERO, &entries);

            let mut collected = Vec::new();
            let mut page = 0u64;
            loop {
                let chunk = paginate(&rows, page, size);
                if chunk.is_empty() {
                    break;
                }
                collected.extend(chunk);
                page += 1;
            }

            prop_assert_eq!(collected.len(), rows.len());
            for (a, b) in collected.iter().zip(rows.iter()) {
                prop_assert_eq!(a.entry_id, b.entry_id);
                prop_assert_eq!(a.running_balance, b.running_balance);
            }
        }

        /// A trial balance built from balanced voucher pairs always balances.
        #[test]
        fn prop_trial_balance_identity(
            amounts in prop::collection::vec(amount_strategy(), 1..20),
        ) {
            // Each amount becomes one voucher: Dr cash / Cr revenue.
            let mut cash = Decimal::ZERO;
            let mut revenue = Decimal::ZERO;
            for amount in &amounts {
                cash += amount;
                revenue += amount;
            }

            let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
            let tb = trial_balance(date, vec![
                TrialBalanceRow {
                    account_id: Uuid::new_v4(),
                    account_code: "CASH01".into(),
                    account_name: "Cash".into(),
                    debit: cash,
                    credit: Decimal::ZERO,
                },
                TrialBalanceRow {
                    account_id: Uuid::new_v4(),
                    account_code: "REV001".into(),
                    account_name: "Sales Revenue".into(),
                    debit: Decimal::ZERO,
                    credit: revenue,
                },
            ]);

            prop_assert_eq!(tb.total_debit, tb.total_credit);
        }
    }
}
