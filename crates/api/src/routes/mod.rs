//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use tracing::error;

use crate::AppState;

pub mod health;
pub mod invoices;
pub mod ledger;
pub mod purchases;
pub mod stock;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(ledger::routes())
        .merge(invoices::routes())
        .merge(purchases::routes())
        .merge(stock::routes())
}

/// Builds the standard error body: `{"error": code, "message": text}`.
pub(crate) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

/// Converts a numeric status from the domain layer into a `StatusCode`.
pub(crate) fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Maps a raw database error to a response.
///
/// Unique-constraint violations surface as a 409: document numbers are
/// not reserved ahead of insert, so two concurrent requests can race to
/// the same number and the loser should simply retry.
pub(crate) fn db_error_response(err: &DbErr) -> Response {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return error_response(
            StatusCode::CONFLICT,
            "DUPLICATE_DOCUMENT_NUMBER",
            "A document with this number was recorded concurrently; retry the request",
        );
    }

    error!(error = %err, "database error");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An error occurred",
    )
}
