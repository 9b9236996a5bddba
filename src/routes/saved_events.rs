use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::{CreateSavedEvent, SavedEvent, SavedEventRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::{json_body, required};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/save_event", post(save_event))
        .route("/my_events", get(my_events))
        .route("/delete_event/:id", delete(delete_event))
}

/// Body of `/save_event`. `id` is accepted for `tm_id` so the records served
/// by `/events` can be posted back as-is.
#[derive(Debug, Deserialize)]
pub struct SaveEventRequest {
    #[serde(alias = "id")]
    pub tm_id: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
}

async fn save_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SaveEventRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let request = json_body(payload)?;

    let (Some(tm_id), Some(name)) = (required(request.tm_id), required(request.name)) else {
        return Err(AppError::Validation(
            "Missing event id or name".to_string(),
        ));
    };

    let event = CreateSavedEvent {
        tm_id,
        name,
        date: request.date,
        venue: request.venue,
        image: request.image,
        url: request.url,
    };

    let saved = SavedEventRepository::create(&state.db, user.id, &event).await?;
    tracing::info!("User {} saved event {}", user.id, saved.tm_id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Event saved", "event": saved })),
    ))
}

async fn my_events(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SavedEvent>>> {
    let events = SavedEventRepository::list_by_user(&state.db, user.id).await?;
    Ok(Json(events))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let Path(id) = id.map_err(|e| AppError::Validation(e.body_text()))?;

    SavedEventRepository::delete(&state.db, user.id, id).await?;
    tracing::info!("User {} removed saved event {}", user.id, id);

    Ok(Json(serde_json::json!({ "message": "Event removed" })))
}
