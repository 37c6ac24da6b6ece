//! Stock routes: manual movements and movement history.

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
use crate::routes::ledger::page_request;
use crate::routes::{db_error_response, error_response, status_from};
use tillbook_core::inventory::{MovementDirection, MovementLine};
use tillbook_db::repositories::stock::{
    MovementFilter, MovementInput, MovementReference, StockError, StockRepository,
};
use tillbook_db::repositories::user;

/// Creates the stock routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stock/in", post(stock_in))
        .route("/stock/out", post(stock_out))
        .route("/stock/movements", get(list_movements))
        .route("/stock/movements/{id}", get(get_movement))
}

/// Maps a stock repository error to a response.
pub(crate) fn stock_error_response(err: &StockError) -> Response {
    match err {
        StockError::Inventory(e) => {
            error_response(status_from(e.http_status_code()), e.error_code(), &e.to_string())
        }
        StockError::MovementNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "MOVEMENT_NOT_FOUND", &err.to_string())
        }
        StockError::Database(e) => db_error_response(e),
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// One line of a manual movement request.
#[derive(Debug, Deserialize)]
pub struct MovementLineRequest {
    /// Product being moved.
    pub product_id: Uuid,
    /// Positive quantity.
    pub quantity: Decimal,
    /// Unit price recorded on the item; defaults to zero.
    #[serde(default)]
    pub price: Decimal,
    /// Unit of measure override.
    pub uom_id: Option<Uuid>,
}

/// Request body for a manual stock movement.
#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    /// Business date (YYYY-MM-DD).
    pub transaction_date: NaiveDate,
    /// Free-text description.
    pub description: Option<String>,
    /// Username the movement is attributed to.
    pub acting_user: Option<String>,
    /// Movement lines.
    pub items: Vec<MovementLineRequest>,
}

/// Query parameters for listing movements.
#[derive(Debug, Deserialize)]
pub struct ListMovementsQuery {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to one direction: IN or OUT.
    pub direction: Option<MovementDirection>,
    /// Restrict to movements touching one product.
    pub product_id: Option<Uuid>,
    /// Page number (0-indexed).
    pub page: Option<u64>,
    /// Items per page.
    pub size: Option<u64>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/stock/in` - Record a manual stock-in movement.
async fn stock_in(
    State(state): State<AppState>,
    Json(payload): Json<CreateMovementRequest>,
) -> impl IntoResponse {
    apply_manual_movement(&state, MovementDirection::In, payload).await
}

/// POST `/stock/out` - Record a manual stock-out movement.
async fn stock_out(
    State(state): State<AppState>,
    Json(payload): Json<CreateMovementRequest>,
) -> impl IntoResponse {
    apply_manual_movement(&state, MovementDirection::Out, payload).await
}

async fn apply_manual_movement(
    state: &AppState,
    direction: MovementDirection,
    payload: CreateMovementRequest,
) -> Response {
    let user_id = match &payload.acting_user {
        Some(username) => match user::find_active_by_username(&*state.db, username).await {
            Ok(user) => user.map(|u| u.id),
            Err(e) => return db_error_response(&e),
        },
        None => None,
    };

    let lines = payload
        .items
        .iter()
        .map(|item| MovementLine {
            product_id: item.product_id,
            quantity: item.quantity,
            price_at_transaction: item.price,
            uom_id: item.uom_id,
        })
        .collect();

    let repo = StockRepository::new((*state.db).clone());
    let input = MovementInput {
        direction,
        transaction_date: payload.transaction_date,
        description: payload.description,
        user_id,
        lines,
        reference: MovementReference::Manual,
    };

    match repo.apply_movement(input).await {
        Ok(movement) => (
            StatusCode::CREATED,
            Json(json!({ "movement": movement.header, "items": movement.items })),
        )
            .into_response(),
        Err(e) => stock_error_response(&e),
    }
}

/// GET `/stock/movements` - List movement headers, newest first.
async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<ListMovementsQuery>,
) -> impl IntoResponse {
    let repo = StockRepository::new((*state.db).clone());

    let filter = MovementFilter {
        from: query.from,
        to: query.to,
        direction: query.direction,
        product_id: query.product_id,
    };

    match repo.list_movements(filter, page_request(query.page, query.size)).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => stock_error_response(&e),
    }
}

/// GET `/stock/movements/{id}` - Fetch one movement with its items.
async fn get_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = StockRepository::new((*state.db).clone());

    match repo.get_movement(id).await {
        Ok(movement) => (
            StatusCode::OK,
            Json(json!({ "movement": movement.header, "items": movement.items })),
        )
            .into_response(),
        Err(e) => stock_error_response(&e),
    }
}
