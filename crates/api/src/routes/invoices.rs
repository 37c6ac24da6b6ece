//! Sales invoice routes: sale recording, lookups, and post-hoc edits.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::routes::ledger::{ledger_error_response, page_request};
use crate::routes::stock::stock_error_response;
use crate::routes::{db_error_response, error_response, status_from};
use tillbook_db::repositories::invoice::{
    CreateInvoiceInput, InvoiceError, InvoiceItemInput, InvoiceListFilter, InvoiceRepository,
    SaleKind, UpdateInvoiceInput, UpdateItemInput,
};

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", post(create_invoice))
        .route("/invoices", get(list_invoices))
        .route("/invoices/next-number", get(next_invoice_number))
        .route("/invoices/by-number/{number}", get(find_by_number))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/{id}", patch(update_invoice))
        .route("/invoices/{id}/items", post(add_item))
        .route("/invoices/{id}/items/{item_id}", patch(update_item))
        .route("/invoices/{id}/items/{item_id}", delete(remove_item))
}

/// Maps an invoice repository error to a response.
fn invoice_error_response(err: &InvoiceError) -> Response {
    match err {
        InvoiceError::DuplicateInvoiceNumber(_) => {
            error_response(StatusCode::CONFLICT, "DUPLICATE_INVOICE_NUMBER", &err.to_string())
        }
        InvoiceError::NotFound(_) | InvoiceError::NotFoundByNumber(_) => {
            error_response(StatusCode::NOT_FOUND, "INVOICE_NOT_FOUND", &err.to_string())
        }
        InvoiceError::ItemNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "INVOICE_ITEM_NOT_FOUND", &err.to_string())
        }
        InvoiceError::CustomerNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "CUSTOMER_NOT_FOUND", &err.to_string())
        }
        InvoiceError::UserNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "USER_NOT_FOUND", &err.to_string())
        }
        InvoiceError::RevenueAccountMissing => {
            error_response(StatusCode::BAD_REQUEST, "REVENUE_ACCOUNT_MISSING", &err.to_string())
        }
        InvoiceError::Inventory(e) => {
            error_response(status_from(e.http_status_code()), e.error_code(), &e.to_string())
        }
        InvoiceError::Stock(e) => stock_error_response(e),
        InvoiceError::Ledger(e) => ledger_error_response(e),
        InvoiceError::Database(e) => db_error_response(e),
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// One line of an invoice request.
#[derive(Debug, Deserialize)]
pub struct InvoiceItemRequest {
    /// Product sold.
    pub product_id: Uuid,
    /// Positive quantity.
    pub quantity: Decimal,
    /// Price override; defaults to the product's selling price.
    pub unit_price: Option<Decimal>,
    /// Unit of measure override.
    pub uom_id: Option<Uuid>,
}

const fn default_sale_kind() -> SaleKind {
    SaleKind::Sale
}

/// Request body for recording a sale.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Explicit invoice number; generated from the day sequence when
    /// absent.
    pub invoice_number: Option<String>,
    /// Business date (YYYY-MM-DD).
    pub invoice_date: NaiveDate,
    /// SALE, RETURN, or EXCHANGE; defaults to SALE.
    #[serde(default = "default_sale_kind")]
    pub transaction_type: SaleKind,
    /// Credit customer; ignored for cash sales.
    pub customer_id: Option<Uuid>,
    /// Walk-in cash sale with no receivable.
    #[serde(default)]
    pub is_cash_customer: bool,
    /// Persist as DRAFT: no stock movement, no posting.
    #[serde(default)]
    pub save_as_draft: bool,
    /// Header discount applied after line totals.
    #[serde(default)]
    pub additional_discount: Decimal,
    /// Header expenses added after line totals.
    #[serde(default)]
    pub additional_expenses: Decimal,
    /// Cash received at the till.
    #[serde(default)]
    pub amount_received: Decimal,
    /// Change handed back.
    #[serde(default)]
    pub change_returned: Decimal,
    /// Free-text remarks.
    pub remarks: Option<String>,
    /// Username of the operator.
    pub acting_user: String,
    /// Line items.
    pub items: Vec<InvoiceItemRequest>,
}

/// Query parameters for listing invoices.
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to one customer.
    pub customer_id: Option<Uuid>,
    /// Page number (0-indexed).
    pub page: Option<u64>,
    /// Items per page.
    pub size: Option<u64>,
}

/// Query parameters for the next-number preview.
#[derive(Debug, Deserialize)]
pub struct NextNumberQuery {
    /// Business date; defaults to today.
    pub date: Option<NaiveDate>,
}

/// Request body for updating invoice header fields.
#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceRequest {
    /// New business date.
    pub invoice_date: Option<NaiveDate>,
    /// New header discount.
    pub additional_discount: Option<Decimal>,
    /// New header expenses.
    pub additional_expenses: Option<Decimal>,
    /// New amount received.
    pub amount_received: Option<Decimal>,
    /// New change returned.
    pub change_returned: Option<Decimal>,
    /// New remarks.
    pub remarks: Option<String>,
}

/// Request body for updating a line item.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit price.
    pub unit_price: Option<Decimal>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/invoices` - Record a sale.
async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let items = payload
        .items
        .iter()
        .map(|item| InvoiceItemInput {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            uom_id: item.uom_id,
        })
        .collect();

    let input = CreateInvoiceInput {
        invoice_number: payload.invoice_number,
        invoice_date: payload.invoice_date,
        kind: payload.transaction_type,
        customer_id: payload.customer_id,
        is_cash_customer: payload.is_cash_customer,
        save_as_draft: payload.save_as_draft,
        additional_discount: payload.additional_discount,
        additional_expenses: payload.additional_expenses,
        amount_received: payload.amount_received,
        change_returned: payload.change_returned,
        remarks: payload.remarks,
        acting_user: payload.acting_user,
        items,
    };

    match repo.create_invoice(input).await {
        Ok(result) => (
            StatusCode::CREATED,
            Json(json!({ "invoice": result.invoice, "items": result.items })),
        )
            .into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// GET `/invoices` - List invoice headers, newest first.
async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let filter = InvoiceListFilter {
        from: query.from,
        to: query.to,
        customer_id: query.customer_id,
    };

    match repo.list(filter, page_request(query.page, query.size)).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// GET `/invoices/next-number` - Preview the next sequential number.
///
/// The number is not reserved; concurrent sales resolve at insert time.
async fn next_invoice_number(
    State(state): State<AppState>,
    Query(query): Query<NextNumberQuery>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    match repo.next_invoice_number(date).await {
        Ok(number) => (StatusCode::OK, Json(json!({ "invoice_number": number }))).into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// GET `/invoices/{id}` - Fetch one invoice with its items.
async fn get_invoice(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    match repo.get(id).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "invoice": result.invoice, "items": result.items })),
        )
            .into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// GET `/invoices/by-number/{number}` - Fetch one invoice by number.
async fn find_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    match repo.find_by_number(&number).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "invoice": result.invoice, "items": result.items })),
        )
            .into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// PATCH `/invoices/{id}` - Update header fields and recompute totals.
///
/// Edits never retrigger stock movements or postings.
async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let update = UpdateInvoiceInput {
        invoice_date: payload.invoice_date,
        additional_discount: payload.additional_discount,
        additional_expenses: payload.additional_expenses,
        amount_received: payload.amount_received,
        change_returned: payload.change_returned,
        remarks: payload.remarks,
    };

    match repo.update_header(id, update).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "invoice": result.invoice, "items": result.items })),
        )
            .into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// POST `/invoices/{id}/items` - Add a line item and recompute totals.
async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoiceItemRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let item = InvoiceItemInput {
        product_id: payload.product_id,
        quantity: payload.quantity,
        unit_price: payload.unit_price,
        uom_id: payload.uom_id,
    };

    match repo.add_item(id, item).await {
        Ok(result) => (
            StatusCode::CREATED,
            Json(json!({ "invoice": result.invoice, "items": result.items })),
        )
            .into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// PATCH `/invoices/{id}/items/{item_id}` - Update a line item.
async fn update_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateItemRequest>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    let update = UpdateItemInput {
        quantity: payload.quantity,
        unit_price: payload.unit_price,
    };

    match repo.update_item(id, item_id, update).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "invoice": result.invoice, "items": result.items })),
        )
            .into_response(),
        Err(e) => invoice_error_response(&e),
    }
}

/// DELETE `/invoices/{id}/items/{item_id}` - Remove a line item.
async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let repo = InvoiceRepository::new((*state.db).clone());

    match repo.remove_item(id, item_id).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "invoice": result.invoice, "items": result.items })),
        )
            .into_response(),
        Err(e) => invoice_error_response(&e),
    }
}
