//! Purchase order routes: order creation, lookups, and goods receipt.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::routes::ledger::{ledger_error_response, page_request};
use crate::routes::stock::stock_error_response;
use crate::routes::{db_error_response, error_response, status_from};
use tillbook_db::repositories::purchase::{
    CreatePurchaseOrderInput, PurchaseError, PurchaseItemInput, PurchaseListFilter,
    PurchaseRepository,
};

/// Creates the purchase order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/purchase-orders", post(create_order))
        .route("/purchase-orders", get(list_orders))
        .route("/purchase-orders/{id}", get(get_order))
        .route("/purchase-orders/{id}/receive", post(receive_order))
}

/// Maps a purchase repository error to a response.
fn purchase_error_response(err: &PurchaseError) -> Response {
    match err {
        PurchaseError::DuplicateOrderNumber(_) => {
            error_response(StatusCode::CONFLICT, "DUPLICATE_ORDER_NUMBER", &err.to_string())
        }
        PurchaseError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", &err.to_string())
        }
        PurchaseError::SupplierNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "SUPPLIER_NOT_FOUND", &err.to_string())
        }
        PurchaseError::AlreadyReceived(_) => {
            error_response(StatusCode::CONFLICT, "ORDER_ALREADY_RECEIVED", &err.to_string())
        }
        PurchaseError::InventoryAccountMissing => {
            error_response(StatusCode::BAD_REQUEST, "INVENTORY_ACCOUNT_MISSING", &err.to_string())
        }
        PurchaseError::Inventory(e) => {
            error_response(status_from(e.http_status_code()), e.error_code(), &e.to_string())
        }
        PurchaseError::Stock(e) => stock_error_response(e),
        PurchaseError::Ledger(e) => ledger_error_response(e),
        PurchaseError::Database(e) => db_error_response(e),
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// One line of a purchase order request.
#[derive(Debug, Deserialize)]
pub struct PurchaseItemRequest {
    /// Product ordered.
    pub product_id: Uuid,
    /// Positive quantity.
    pub quantity: Decimal,
    /// Agreed unit price.
    pub unit_price: Decimal,
    /// Unit of measure override.
    pub uom_id: Option<Uuid>,
}

/// Request body for creating a purchase order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Human-readable order number, unique.
    pub order_number: String,
    /// Supplier being ordered from.
    pub supplier_id: Uuid,
    /// Business date (YYYY-MM-DD).
    pub order_date: NaiveDate,
    /// Free-text remarks.
    pub remarks: Option<String>,
    /// Username of the operator.
    pub acting_user: Option<String>,
    /// Line items.
    pub items: Vec<PurchaseItemRequest>,
}

/// Request body for receiving an order.
#[derive(Debug, Deserialize)]
pub struct ReceiveOrderRequest {
    /// Username of the operator.
    pub acting_user: Option<String>,
}

/// Query parameters for listing purchase orders.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to one supplier.
    pub supplier_id: Option<Uuid>,
    /// Page number (0-indexed).
    pub page: Option<u64>,
    /// Items per page.
    pub size: Option<u64>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/purchase-orders` - Create a purchase order in DRAFT status.
async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> impl IntoResponse {
    let repo = PurchaseRepository::new((*state.db).clone());

    let items = payload
        .items
        .iter()
        .map(|item| PurchaseItemInput {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            uom_id: item.uom_id,
        })
        .collect();

    let input = CreatePurchaseOrderInput {
        order_number: payload.order_number,
        supplier_id: payload.supplier_id,
        order_date: payload.order_date,
        remarks: payload.remarks,
        acting_user: payload.acting_user,
        items,
    };

    match repo.create(input).await {
        Ok(result) => (
            StatusCode::CREATED,
            Json(json!({ "order": result.order, "items": result.items })),
        )
            .into_response(),
        Err(e) => purchase_error_response(&e),
    }
}

/// GET `/purchase-orders` - List order headers, newest first.
async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> impl IntoResponse {
    let repo = PurchaseRepository::new((*state.db).clone());

    let filter = PurchaseListFilter {
        from: query.from,
        to: query.to,
        supplier_id: query.supplier_id,
    };

    match repo.list(filter, page_request(query.page, query.size)).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => purchase_error_response(&e),
    }
}

/// GET `/purchase-orders/{id}` - Fetch one order with its items.
async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let repo = PurchaseRepository::new((*state.db).clone());

    match repo.get(id).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "order": result.order, "items": result.items })),
        )
            .into_response(),
        Err(e) => purchase_error_response(&e),
    }
}

/// POST `/purchase-orders/{id}/receive` - Receive the ordered goods.
///
/// Moves stock IN, posts Dr Inventory / Cr supplier, and flips the order
/// to RECEIVED. Receiving twice is a conflict.
async fn receive_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceiveOrderRequest>,
) -> impl IntoResponse {
    let repo = PurchaseRepository::new((*state.db).clone());

    match repo.receive(id, payload.acting_user.as_deref()).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "order": result.order, "items": result.items })),
        )
            .into_response(),
        Err(e) => purchase_error_response(&e),
    }
}
