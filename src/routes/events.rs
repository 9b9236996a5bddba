use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::routes::required;
use crate::services::events::EventRecord;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(list_events))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub city: Option<String>,
}

/// Upcoming events for a city. Provider failures are logged and reported
/// the same way as an empty result.
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> AppResult<Json<Vec<EventRecord>>> {
    let city = required(query.city)
        .unwrap_or_else(|| state.config.ticketmaster.default_city.clone());

    let events = match state.events.fetch(&city, Utc::now()).await {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!("Error fetching events for {}: {}", city, e);
            Vec::new()
        }
    };

    if events.is_empty() {
        return Err(AppError::NotFound(format!("No events found in {}", city)));
    }

    Ok(Json(events))
}
