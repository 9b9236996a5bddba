use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SavedEvent {
    pub id: i64,
    pub user_id: i64,
    /// Event identifier assigned by the events provider.
    pub tm_id: String,
    pub name: String,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSavedEvent {
    pub tm_id: String,
    pub name: String,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
}
