//! Database initialization
//!
//! Creates the database file and schema on first run; reopening an existing
//! database is a no-op for the schema.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL keeps readers unblocked while the persistence writer inserts
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Schema creation (idempotent)
    create_sessions_table(&pool).await?;
    create_sets_table(&pool).await?;
    create_reps_table(&pool).await?;

    Ok(pool)
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            started_at TEXT NOT NULL,
            notes TEXT
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_sets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL REFERENCES sessions(id),
            exercise_name TEXT,
            target_reps INTEGER,
            created_at TEXT NOT NULL,
            actual_reps INTEGER,
            avg_tempo_ms INTEGER
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_reps_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS reps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            set_id INTEGER NOT NULL REFERENCES sets(id),
            rep_index INTEGER NOT NULL,
            t_ms_start INTEGER NOT NULL,
            t_ms_end INTEGER NOT NULL,
            peak_amag REAL NOT NULL,
            tempo_ms INTEGER
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}
