//! Rep record queries

use sqlx::SqlitePool;

use crate::db::models::RepRecord;
use crate::Result;

/// Insert one rep record. Issued exactly once per reconciled rep; the store
/// does not deduplicate.
pub async fn insert_rep(
    pool: &SqlitePool,
    set_id: i64,
    rep_index: i64,
    t_ms_start: i64,
    t_ms_end: i64,
    peak_amag: f64,
    tempo_ms: Option<i64>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO reps (set_id, rep_index, t_ms_start, t_ms_end, peak_amag, tempo_ms)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(set_id)
    .bind(rep_index)
    .bind(t_ms_start)
    .bind(t_ms_end)
    .bind(peak_amag)
    .bind(tempo_ms)
    .execute(pool)
    .await?;
    Ok(())
}

/// All reps of one set, in rep-index order.
pub async fn list_reps(pool: &SqlitePool, set_id: i64) -> Result<Vec<RepRecord>> {
    let records = sqlx::query_as::<_, RepRecord>(
        "SELECT id, set_id, rep_index, t_ms_start, t_ms_end, peak_amag, tempo_ms
         FROM reps WHERE set_id = ? ORDER BY rep_index",
    )
    .bind(set_id)
    .fetch_all(pool)
    .await?;
    Ok(records)
}
