use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,

    // bcrypt hash; never leaves the server
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: NaiveDateTime,
}
