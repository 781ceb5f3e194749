//! Set record queries

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::SetRecord;
use crate::Result;

/// Create a set record at `start_set`. The store assigns the id; the
/// summary columns stay NULL until the set closes.
pub async fn create_set(
    pool: &SqlitePool,
    session_id: i64,
    exercise_name: Option<&str>,
    target_reps: Option<i64>,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO sets (session_id, exercise_name, target_reps, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(exercise_name)
    .bind(target_reps)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Write the closing summary onto a set record. Issued exactly once per set.
pub async fn update_set(
    pool: &SqlitePool,
    set_id: i64,
    actual_reps: i64,
    avg_tempo_ms: Option<i64>,
) -> Result<()> {
    sqlx::query("UPDATE sets SET actual_reps = ?, avg_tempo_ms = ? WHERE id = ?")
        .bind(actual_reps)
        .bind(avg_tempo_ms)
        .bind(set_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fetch one set record by id.
pub async fn get_set(pool: &SqlitePool, set_id: i64) -> Result<SetRecord> {
    let record = sqlx::query_as::<_, SetRecord>(
        "SELECT id, session_id, exercise_name, target_reps, created_at, actual_reps, avg_tempo_ms
         FROM sets WHERE id = ?",
    )
    .bind(set_id)
    .fetch_one(pool)
    .await?;
    Ok(record)
}
