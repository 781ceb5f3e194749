//! Database roundtrip tests against scratch SQLite files

use repsense_common::db;
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn scratch_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("create temp dir");
    let pool = db::init_database(&dir.path().join("repsense.db"))
        .await
        .expect("init database");
    (dir, pool)
}

#[tokio::test]
async fn session_set_rep_roundtrip() {
    let (_dir, pool) = scratch_pool().await;

    let started_at = repsense_common::time::now();
    let session_id = db::sessions::create_session(&pool, "bench-unit-7", started_at, Some("morning"))
        .await
        .unwrap();
    assert_eq!(session_id, 1);

    let session = db::sessions::get_session(&pool, session_id).await.unwrap();
    assert_eq!(session.device_id, "bench-unit-7");
    assert_eq!(session.notes.as_deref(), Some("morning"));

    let set_id = db::sets::create_set(&pool, session_id, Some("deadlift"), Some(8), started_at)
        .await
        .unwrap();

    let open = db::sets::get_set(&pool, set_id).await.unwrap();
    assert_eq!(open.session_id, session_id);
    assert_eq!(open.exercise_name.as_deref(), Some("deadlift"));
    assert_eq!(open.target_reps, Some(8));
    assert_eq!(open.actual_reps, None);
    assert_eq!(open.avg_tempo_ms, None);

    db::reps::insert_rep(&pool, set_id, 1, 1000, 1500, 1.21, Some(500))
        .await
        .unwrap();
    db::reps::insert_rep(&pool, set_id, 2, 1500, 2200, 1.34, Some(700))
        .await
        .unwrap();

    db::sets::update_set(&pool, set_id, 2, Some(600)).await.unwrap();

    let closed = db::sets::get_set(&pool, set_id).await.unwrap();
    assert_eq!(closed.actual_reps, Some(2));
    assert_eq!(closed.avg_tempo_ms, Some(600));

    let reps = db::reps::list_reps(&pool, set_id).await.unwrap();
    assert_eq!(reps.len(), 2);
    assert_eq!(reps[0].rep_index, 1);
    assert_eq!(reps[0].tempo_ms, Some(500));
    assert_eq!(reps[1].rep_index, 2);
    assert_eq!(reps[1].t_ms_end, 2200);
}

#[tokio::test]
async fn zero_rep_set_closes_with_null_average() {
    let (_dir, pool) = scratch_pool().await;

    let session_id =
        db::sessions::create_session(&pool, "bench-unit-7", repsense_common::time::now(), None)
            .await
            .unwrap();
    let set_id =
        db::sets::create_set(&pool, session_id, None, None, repsense_common::time::now())
            .await
            .unwrap();

    db::sets::update_set(&pool, set_id, 0, None).await.unwrap();

    let closed = db::sets::get_set(&pool, set_id).await.unwrap();
    assert_eq!(closed.actual_reps, Some(0));
    assert_eq!(closed.avg_tempo_ms, None);
}

#[tokio::test]
async fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("repsense.db");

    let pool = db::init_database(&path).await.unwrap();
    let session_id =
        db::sessions::create_session(&pool, "dev", repsense_common::time::now(), None)
            .await
            .unwrap();
    pool.close().await;

    // Reopening must not clobber existing rows
    let pool = db::init_database(&path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(session_id, 1);
}
