pub mod plans;
pub mod stores;
pub mod subscriptions;
pub mod themes;
pub mod users;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// List envelope used by every collection endpoint.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self { items, total }
    }
}

pub(crate) type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn db_error(e: sea_orm::DbErr) -> ApiError {
    tracing::error!("database error: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("DB error: {e}") })),
    )
}

pub(crate) fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{what} not found") })),
    )
}

pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}

pub(crate) fn conflict(message: impl Into<String>) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(json!({ "error": message.into() })),
    )
}
