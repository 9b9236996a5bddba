use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, routing::get, Json, Router};

use crate::error::{AppError, AppResult};
use crate::AppState;

pub mod auth;
pub mod events;
pub mod health;
pub mod saved_events;

/// All routes. `auth_routes` is passed in so the caller can wrap the public
/// credential endpoints (`/register`, `/login`) in extra layers (rate limiting)
/// before merging.
pub fn router(auth_routes: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health::home))
        .route("/health", get(health::health_check))
        .merge(auth_routes)
        .merge(auth::session_router())
        .merge(events::router())
        .merge(saved_events::router())
}

/// Unwrap a JSON body, turning axum's plain-text rejection into a validation error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(body)| body).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e.body_text());
        AppError::Validation(e.body_text())
    })
}

/// A required string field: present and not blank after trimming.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
