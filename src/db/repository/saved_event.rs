use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{CreateSavedEvent, SavedEvent};
use crate::error::{AppError, AppResult};

// ============================================================================
// Saved Event Repository
// ============================================================================

pub struct SavedEventRepository;

impl SavedEventRepository {
    /// Save an event for a user. Rejects a second save of the same provider
    /// event with `AppError::Conflict`; the UNIQUE (user_id, tm_id) constraint
    /// covers concurrent requests that both pass the pre-check.
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        event: &CreateSavedEvent,
    ) -> AppResult<SavedEvent> {
        if Self::find_by_user_and_tm_id(pool, user_id, &event.tm_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Event already saved".to_string()));
        }

        let now = Utc::now().naive_utc();

        let result = sqlx::query_as::<_, SavedEvent>(
            r#"
            INSERT INTO saved_events (
                user_id, tm_id, name, date, venue, image, url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, tm_id, name, date, venue, image, url, created_at
            "#,
        )
        .bind(user_id)
        .bind(&event.tm_id)
        .bind(&event.name)
        .bind(&event.date)
        .bind(&event.venue)
        .bind(&event.image)
        .bind(&event.url)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database);

        match result {
            Err(e) if e.is_unique_violation() => {
                Err(AppError::Conflict("Event already saved".to_string()))
            }
            other => other,
        }
    }

    pub async fn find_by_user_and_tm_id(
        pool: &SqlitePool,
        user_id: i64,
        tm_id: &str,
    ) -> AppResult<Option<SavedEvent>> {
        sqlx::query_as::<_, SavedEvent>(
            r#"
            SELECT id, user_id, tm_id, name, date, venue, image, url, created_at
            FROM saved_events
            WHERE user_id = ? AND tm_id = ?
            "#,
        )
        .bind(user_id)
        .bind(tm_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// All events saved by a user, in insertion order.
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<SavedEvent>> {
        sqlx::query_as::<_, SavedEvent>(
            r#"
            SELECT id, user_id, tm_id, name, date, venue, image, url, created_at
            FROM saved_events
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Delete a saved event owned by `user_id`. Events owned by someone else
    /// are reported the same as missing ones.
    pub async fn delete(pool: &SqlitePool, user_id: i64, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM saved_events WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        Ok(())
    }
}
