//! Session record queries

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::SessionRecord;
use crate::Result;

/// Create a session record. The store assigns the id.
pub async fn create_session(
    pool: &SqlitePool,
    device_id: &str,
    started_at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO sessions (device_id, started_at, notes) VALUES (?, ?, ?)")
        .bind(device_id)
        .bind(started_at)
        .bind(notes)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Fetch one session record by id.
pub async fn get_session(pool: &SqlitePool, session_id: i64) -> Result<SessionRecord> {
    let record = sqlx::query_as::<_, SessionRecord>(
        "SELECT id, device_id, started_at, notes FROM sessions WHERE id = ?",
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;
    Ok(record)
}
