//! Ledger repository: the posting engine and the report engine.
//!
//! `post_in` is the single writer of ledger entries. It locks both
//! account rows with `SELECT ... FOR UPDATE` (ordered by id so two
//! concurrent postings over the same pair cannot deadlock), validates
//! through the core posting rules, appends the balanced entry pair, and
//! refreshes the cached balances. Reports never read the cache; they
//! replay the entry log.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, FromQueryResult, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use tillbook_core::ledger::{
    AccountInfo, BalanceSide, LedgerReport, PostingError, PostingInput, PostingService,
    ReportEntry, TrialBalance, TrialBalanceRow, build_report, cached_balance_after, trial_balance,
};
use tillbook_shared::types::{PageRequest, PageResponse};

use crate::entities::{accounts, ledger_entries};
use crate::repositories::user;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A posting precondition failed.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Account not found (report target).
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// The entry pair produced by one posting.
#[derive(Debug, Clone)]
pub struct PostedEntries {
    /// The debit-side entry.
    pub debit: ledger_entries::Model,
    /// The credit-side entry.
    pub credit: ledger_entries::Model,
}

/// Input for a manual ledger entry from the API.
#[derive(Debug, Clone)]
pub struct ManualPostingInput {
    /// Voucher number grouping the pair.
    pub voucher_no: String,
    /// Business date.
    pub date: NaiveDate,
    /// Shared description.
    pub description: Option<String>,
    /// Account to debit.
    pub debit_account_id: Uuid,
    /// Account to credit.
    pub credit_account_id: Uuid,
    /// Amount posted to both sides.
    pub amount: Decimal,
    /// Username the posting is attributed to, if known.
    pub acting_user: Option<String>,
}

/// Filter options for listing ledger entries.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to a single account.
    pub account_id: Option<Uuid>,
}

/// A ledger report together with the account it describes.
#[derive(Debug, Clone)]
pub struct AccountLedgerReport {
    /// The reported account.
    pub account: accounts::Model,
    /// Opening balance, running-balance page, and totals.
    pub report: LedgerReport,
}

#[derive(Debug, FromQueryResult)]
struct TrialBalanceSums {
    account_id: Uuid,
    account_code: String,
    account_name: String,
    debit_total: Decimal,
    credit_total: Decimal,
}

const OPENING_BALANCE_SQL: &str = "SELECT COALESCE(SUM(debit_amount - credit_amount), 0) AS signed_sum \
     FROM ledger_entries WHERE account_id = $1 AND transaction_date < $2";

const TRIAL_BALANCE_SQL: &str = "SELECT a.id AS account_id, a.account_code, a.account_name, \
     COALESCE(SUM(le.debit_amount), 0) AS debit_total, \
     COALESCE(SUM(le.credit_amount), 0) AS credit_total \
     FROM accounts a \
     LEFT JOIN ledger_entries le ON le.account_id = a.id AND le.transaction_date <= $1 \
     WHERE a.is_active = TRUE \
     GROUP BY a.id, a.account_code, a.account_name \
     HAVING COALESCE(SUM(le.debit_amount), 0) <> 0 OR COALESCE(SUM(le.credit_amount), 0) <> 0 \
     ORDER BY a.account_code";

/// Ledger repository: posting, entry listing, and reports.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Posts one balanced debit/credit pair in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the database rejects the
    /// write; nothing is persisted in either case.
    pub async fn post(&self, input: PostingInput) -> Result<PostedEntries, LedgerError> {
        let txn = self.db.begin().await?;
        let posted = Self::post_in(&txn, &input).await?;
        txn.commit().await?;
        Ok(posted)
    }

    /// Posts a manual ledger entry, resolving the acting user first.
    ///
    /// An unknown or absent username leaves the entries unattributed
    /// rather than failing the posting.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the write fails.
    pub async fn post_manual(
        &self,
        input: ManualPostingInput,
    ) -> Result<PostedEntries, LedgerError> {
        let txn = self.db.begin().await?;

        let created_by = match &input.acting_user {
            Some(username) => user::find_active_by_username(&txn, username)
                .await?
                .map(|u| u.id),
            None => None,
        };

        let posted = Self::post_in(
            &txn,
            &PostingInput {
                voucher_no: input.voucher_no,
                date: input.date,
                description: input.description,
                debit_account_id: input.debit_account_id,
                credit_account_id: input.credit_account_id,
                amount: input.amount,
                ref_type: None,
                ref_id: None,
                created_by,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(posted)
    }

    /// Posts inside an already-open transaction.
    ///
    /// Used by the sale and purchase orchestrators so the posting commits
    /// or rolls back together with the document that caused it.
    ///
    /// # Errors
    ///
    /// Returns a `PostingError` if a precondition fails, or a database
    /// error; the caller's transaction decides the final outcome.
    pub async fn post_in(
        txn: &DatabaseTransaction,
        input: &PostingInput,
    ) -> Result<PostedEntries, LedgerError> {
        // Lock both account rows in id order.
        let locked = accounts::Entity::find()
            .filter(
                accounts::Column::Id.is_in([input.debit_account_id, input.credit_account_id]),
            )
            .order_by_asc(accounts::Column::Id)
            .lock_exclusive()
            .all(txn)
            .await?;

        let (debit_account, credit_account) = PostingService::validate(
            input.amount,
            input.debit_account_id,
            input.credit_account_id,
            |id| {
                locked.iter().find(|a| a.id == id).map(|a| AccountInfo {
                    id: a.id,
                    is_active: a.is_active,
                    current_balance: a.current_balance,
                    balance_type: BalanceSide::from_str_lossy(&a.balance_type),
                })
            },
        )?;

        let now = Utc::now().into();
        let ref_type = input.ref_type.map(|r| r.as_str().to_string());

        let debit_entry = ledger_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            voucher_no: Set(input.voucher_no.clone()),
            account_id: Set(input.debit_account_id),
            transaction_date: Set(input.date),
            description: Set(input.description.clone()),
            debit_amount: Set(input.amount),
            credit_amount: Set(Decimal::ZERO),
            ref_type: Set(ref_type.clone()),
            ref_id: Set(input.ref_id),
            created_by: Set(input.created_by),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let credit_entry = ledger_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            voucher_no: Set(input.voucher_no.clone()),
            account_id: Set(input.credit_account_id),
            transaction_date: Set(input.date),
            description: Set(input.description.clone()),
            debit_amount: Set(Decimal::ZERO),
            credit_amount: Set(input.amount),
            ref_type: Set(ref_type),
            ref_id: Set(input.ref_id),
            created_by: Set(input.created_by),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        Self::refresh_cached_balance(txn, &locked, &debit_account, input.amount, BalanceSide::Debit)
            .await?;
        Self::refresh_cached_balance(
            txn,
            &locked,
            &credit_account,
            input.amount,
            BalanceSide::Credit,
        )
        .await?;

        tracing::info!(
            voucher_no = %input.voucher_no,
            amount = %input.amount,
            debit_account = %input.debit_account_id,
            credit_account = %input.credit_account_id,
            "posted ledger entry pair"
        );

        Ok(PostedEntries {
            debit: debit_entry,
            credit: credit_entry,
        })
    }

    async fn refresh_cached_balance(
        txn: &DatabaseTransaction,
        locked: &[accounts::Model],
        account: &AccountInfo,
        amount: Decimal,
        posted_side: BalanceSide,
    ) -> Result<(), LedgerError> {
        let (balance, side) = cached_balance_after(account.current_balance, amount, posted_side);

        let model = locked
            .iter()
            .find(|a| a.id == account.id)
            .ok_or(PostingError::AccountNotFound(account.id))?;

        let mut active = model.clone().into_active_model();
        active.current_balance = Set(balance);
        active.balance_type = Set(side.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await?;

        Ok(())
    }

    /// Lists ledger entries with optional date range and account filters,
    /// in replay order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_entries(
        &self,
        filter: EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<ledger_entries::Model>, LedgerError> {
        let page = page.normalized();

        let mut query = ledger_entries::Entity::find();
        if let Some(from) = filter.from {
            query = query.filter(ledger_entries::Column::TransactionDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(ledger_entries::Column::TransactionDate.lte(to));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(ledger_entries::Column::AccountId.eq(account_id));
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_asc(ledger_entries::Column::TransactionDate)
            .order_by_asc(ledger_entries::Column::EntrySeq)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.size, total))
    }

    /// Builds the ledger report for one account over a date range.
    ///
    /// The opening balance is the signed sum of all entries strictly
    /// before `from`; the full period is fetched in `(transaction_date,
    /// entry_seq)` order and replayed in memory, with pagination applied
    /// to the replayed rows.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown account, or a database
    /// error.
    pub async fn ledger_report(
        &self,
        account_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        page: PageRequest,
    ) -> Result<AccountLedgerReport, LedgerError> {
        let page = page.normalized();

        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.db)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let opening_signed = self.opening_balance(account_id, from).await?;

        let entries: Vec<ReportEntry> = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(account_id))
            .filter(ledger_entries::Column::TransactionDate.gte(from))
            .filter(ledger_entries::Column::TransactionDate.lte(to))
            .order_by_asc(ledger_entries::Column::TransactionDate)
            .order_by_asc(ledger_entries::Column::EntrySeq)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|e| ReportEntry {
                entry_id: e.id,
                seq: e.entry_seq,
                voucher_no: e.voucher_no,
                transaction_date: e.transaction_date,
                description: e.description,
                debit_amount: e.debit_amount,
                credit_amount: e.credit_amount,
            })
            .collect();

        let report = build_report(opening_signed, &entries, page.page, page.size);

        Ok(AccountLedgerReport { account, report })
    }

    /// Signed sum of all entries for an account before a date.
    async fn opening_balance(
        &self,
        account_id: Uuid,
        before: NaiveDate,
    ) -> Result<Decimal, LedgerError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            OPENING_BALANCE_SQL,
            [account_id.into(), before.into()],
        );

        match self.db.query_one(stmt).await? {
            Some(row) => Ok(row.try_get::<Decimal>("", "signed_sum")?),
            None => Ok(Decimal::ZERO),
        }
    }

    /// Trial balance as of a date: per-account debit/credit sums over all
    /// active accounts, zero-sum accounts excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn trial_balance(&self, as_of: NaiveDate) -> Result<TrialBalance, LedgerError> {
        let stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, TRIAL_BALANCE_SQL, [as_of.into()]);

        let rows = TrialBalanceSums::find_by_statement(stmt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| TrialBalanceRow {
                account_id: r.account_id,
                account_code: r.account_code,
                account_name: r.account_name,
                debit: r.debit_total,
                credit: r.credit_total,
            })
            .collect();

        Ok(trial_balance(as_of, rows))
    }
}

/// Finds the first active account of a given type, ordered by code.
///
/// Used by the orchestrators to resolve the Revenue and Inventory
/// accounts.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn first_active_account_by_type<C: ConnectionTrait>(
    conn: &C,
    account_type: &str,
) -> Result<Option<accounts::Model>, DbErr> {
    accounts::Entity::find()
        .filter(accounts::Column::AccountType.eq(account_type))
        .filter(accounts::Column::IsActive.eq(true))
        .order_by_asc(accounts::Column::AccountCode)
        .one(conn)
        .await
}
