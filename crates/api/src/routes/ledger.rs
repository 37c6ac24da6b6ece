//! Ledger routes: manual postings, entry listing, reports, and the
//! trial balance.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::routes::{db_error_response, error_response, status_from};
use tillbook_db::repositories::ledger::{
    EntryFilter, LedgerError, LedgerRepository, ManualPostingInput,
};
use tillbook_shared::types::PageRequest;

/// Creates the ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ledger/entries", post(create_entry))
        .route("/ledger/entries", get(list_entries))
        .route("/ledger/report", get(ledger_report))
        .route("/ledger/trial-balance", get(trial_balance))
}

/// Maps a ledger repository error to a response.
pub(crate) fn ledger_error_response(err: &LedgerError) -> Response {
    match err {
        LedgerError::Posting(e) => {
            error_response(status_from(e.http_status_code()), e.error_code(), &e.to_string())
        }
        LedgerError::AccountNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND", &err.to_string())
        }
        LedgerError::Database(e) => db_error_response(e),
    }
}

/// Resolves the report period; either bound left out defaults to today.
fn report_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    (from.unwrap_or(today), to.unwrap_or(today))
}

/// Builds a `PageRequest` from optional query parameters.
pub(crate) fn page_request(page: Option<u64>, size: Option<u64>) -> PageRequest {
    let mut request = PageRequest::default();
    if let Some(page) = page {
        request.page = page;
    }
    if let Some(size) = size {
        request.size = size;
    }
    request
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for a manual ledger posting.
#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    /// Voucher number grouping the pair.
    pub voucher_no: String,
    /// Business date (YYYY-MM-DD).
    pub date: NaiveDate,
    /// Description shared by both entries.
    pub description: Option<String>,
    /// Account to debit.
    pub debit_account_id: Uuid,
    /// Account to credit.
    pub credit_account_id: Uuid,
    /// Amount posted to both sides.
    pub amount: Decimal,
    /// Username the posting is attributed to.
    pub acting_user: Option<String>,
}

/// Query parameters for listing ledger entries.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to a single account.
    pub account_id: Option<Uuid>,
    /// Page number (0-indexed).
    pub page: Option<u64>,
    /// Items per page.
    pub size: Option<u64>,
}

/// Query parameters for the account ledger report.
#[derive(Debug, Deserialize)]
pub struct LedgerReportQuery {
    /// The reported account.
    pub account_id: Uuid,
    /// Inclusive start date; defaults to today.
    pub from: Option<NaiveDate>,
    /// Inclusive end date; defaults to today.
    pub to: Option<NaiveDate>,
    /// Page number (0-indexed).
    pub page: Option<u64>,
    /// Items per page.
    pub size: Option<u64>,
}

/// Query parameters for the trial balance.
#[derive(Debug, Deserialize)]
pub struct TrialBalanceQuery {
    /// Cut-off date; defaults to today.
    pub as_of: Option<NaiveDate>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/ledger/entries` - Post a manual debit/credit pair.
async fn create_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateEntryRequest>,
) -> impl IntoResponse {
    let repo = LedgerRepository::new((*state.db).clone());

    let input = ManualPostingInput {
        voucher_no: payload.voucher_no,
        date: payload.date,
        description: payload.description,
        debit_account_id: payload.debit_account_id,
        credit_account_id: payload.credit_account_id,
        amount: payload.amount,
        acting_user: payload.acting_user,
    };

    match repo.post_manual(input).await {
        Ok(posted) => (
            StatusCode::CREATED,
            Json(json!({ "debit": posted.debit, "credit": posted.credit })),
        )
            .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/ledger/entries` - List ledger entries in replay order.
async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListEntriesQuery>,
) -> impl IntoResponse {
    let repo = LedgerRepository::new((*state.db).clone());

    let filter = EntryFilter {
        from: query.from,
        to: query.to,
        account_id: query.account_id,
    };

    match repo.list_entries(filter, page_request(query.page, query.size)).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/ledger/report` - Running-balance report for one account.
async fn ledger_report(
    State(state): State<AppState>,
    Query(query): Query<LedgerReportQuery>,
) -> impl IntoResponse {
    let repo = LedgerRepository::new((*state.db).clone());
    let (from, to) = report_range(query.from, query.to);

    match repo
        .ledger_report(query.account_id, from, to, page_request(query.page, query.size))
        .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "account": {
                    "id": result.account.id,
                    "account_code": result.account.account_code,
                    "account_name": result.account.account_name,
                    "account_type": result.account.account_type,
                },
                "report": result.report,
            })),
        )
            .into_response(),
        Err(e) => ledger_error_response(&e),
    }
}

/// GET `/ledger/trial-balance` - Trial balance as of a date.
async fn trial_balance(
    State(state): State<AppState>,
    Query(query): Query<TrialBalanceQuery>,
) -> impl IntoResponse {
    let repo = LedgerRepository::new((*state.db).clone());
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());

    match repo.trial_balance(as_of).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => ledger_error_response(&e),
    }
}
