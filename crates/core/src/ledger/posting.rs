//! Posting engine validation and cached balance rules.
//!
//! The posting engine is the only writer of ledger entries. This module
//! holds the pure part: precondition checks against injected account
//! state, and the arithmetic applied to the denormalized account balance
//! cache. Persistence lives in the db crate.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::PostingError;
use super::types::BalanceSide;

/// Account state needed to validate a posting.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    /// The account ID.
    pub id: Uuid,
    /// Whether the account is active.
    pub is_active: bool,
    /// Cached balance magnitude.
    pub current_balance: Decimal,
    /// Side the cached magnitude represents.
    pub balance_type: BalanceSide,
}

/// Posting validation service.
///
/// Pure business logic with no database dependencies; account state is
/// supplied by the caller through a lookup closure.
pub struct PostingService;

impl PostingService {
    /// Validate a posting before persisting.
    ///
    /// Checks, in order:
    /// 1. `amount` is strictly positive
    /// 2. debit and credit accounts differ
    /// 3. both accounts exist
    /// 4. both accounts are active
    ///
    /// Returns the resolved (debit, credit) account pair on success so
    /// callers can apply the balance update without a second lookup.
    ///
    /// # Errors
    ///
    /// Returns `PostingError` if any precondition fails. Nothing has been
    /// written at that point.
    pub fn validate<A>(
        amount: Decimal,
        debit_account_id: Uuid,
        credit_account_id: Uuid,
        account_lookup: A,
    ) -> Result<(AccountInfo, AccountInfo), PostingError>
    where
        A: Fn(Uuid) -> Option<AccountInfo>,
    {
        if amount <= Decimal::ZERO {
            return Err(PostingError::InvalidAmount(amount));
        }
        if debit_account_id == credit_account_id {
            return Err(PostingError::SameAccount);
        }

        let debit = account_lookup(debit_account_id)
            .ok_or(PostingError::AccountNotFound(debit_account_id))?;
        let credit = account_lookup(credit_account_id)
            .ok_or(PostingError::AccountNotFound(credit_account_id))?;

        if !debit.is_active {
            return Err(PostingError::AccountInactive(debit.id));
        }
        if !credit.is_active {
            return Err(PostingError::AccountInactive(credit.id));
        }

        Ok((debit, credit))
    }
}

/// Applies a posting to the cached account balance.
///
/// The cache collapses to a net magnitude with a side flag rather than a
/// signed running total: the posted side's magnitude grows by `amount`
/// and the side flag is forced to the posted side. Only the entry log,
/// replayed by the report engine, is authoritative for history.
#[must_use]
pub fn cached_balance_after(
    current_balance: Decimal,
    amount: Decimal,
    posted_side: BalanceSide,
) -> (Decimal, BalanceSide) {
    (current_balance + amount, posted_side)
}
