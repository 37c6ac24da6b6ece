//! Ledger domain types for posting and reporting.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the ledger a balance magnitude represents.
///
/// Account balances are stored as a non-negative magnitude plus this flag,
/// mirroring how they appear on printed ledgers ("1,200.00 Dr").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceSide {
    /// Debit side.
    #[serde(rename = "Dr")]
    Debit,
    /// Credit side.
    #[serde(rename = "Cr")]
    Credit,
}

impl BalanceSide {
    /// The two-letter display form used on reports and stored on accounts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "Dr",
            Self::Credit => "Cr",
        }
    }

    /// Parses the stored two-letter form. Unknown values read as debit.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("cr") {
            Self::Credit
        } else {
            Self::Debit
        }
    }
}

/// The document a posting or stock movement originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentRef {
    /// A sales invoice.
    Sale,
    /// A purchase order.
    Purchase,
}

impl DocumentRef {
    /// The stored reference-type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Purchase => "PURCHASE",
        }
    }
}

/// Input to the posting engine: one balanced debit/credit pair.
#[derive(Debug, Clone)]
pub struct PostingInput {
    /// Voucher number grouping the two entries.
    pub voucher_no: String,
    /// Business date of the posting.
    pub date: NaiveDate,
    /// Description shared by both entries.
    pub description: Option<String>,
    /// Account to debit.
    pub debit_account_id: Uuid,
    /// Account to credit.
    pub credit_account_id: Uuid,
    /// Amount posted to both sides.
    pub amount: Decimal,
    /// Originating document type, if any.
    pub ref_type: Option<DocumentRef>,
    /// Originating document id, if any.
    pub ref_id: Option<Uuid>,
    /// User the posting is attributed to.
    pub created_by: Option<Uuid>,
}
