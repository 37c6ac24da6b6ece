//! Double-entry posting rules and ledger reporting.
//!
//! This module implements the core ledger functionality:
//! - Posting precondition validation (the only writer of ledger entries)
//! - Cached balance magnitude/side arithmetic
//! - Running balance replay from the append-only entry log
//! - Trial balance aggregation

pub mod error;
pub mod posting;
pub mod report;
pub mod types;

pub use error::PostingError;
pub use posting::{AccountInfo, PostingService, cached_balance_after};
pub use report::{
    LedgerReport, ReportEntry, RunningBalanceRow, TrialBalance, TrialBalanceRow, build_report,
    paginate, replay_running_balance, signed_sum, split_magnitude, trial_balance,
};
pub use types::{BalanceSide, DocumentRef, PostingInput};
