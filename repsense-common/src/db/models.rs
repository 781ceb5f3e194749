//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: i64,
    pub device_id: String,
    pub started_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SetRecord {
    pub id: i64,
    pub session_id: i64,
    pub exercise_name: Option<String>,
    pub target_reps: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Filled once, at close
    pub actual_reps: Option<i64>,
    /// Filled once, at close; NULL when the set recorded no reps
    pub avg_tempo_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RepRecord {
    pub id: i64,
    pub set_id: i64,
    pub rep_index: i64,
    pub t_ms_start: i64,
    pub t_ms_end: i64,
    pub peak_amag: f64,
    pub tempo_ms: Option<i64>,
}
