//! Asynchronous persistence writer
//!
//! Records are handed off through a bounded work queue to a dedicated
//! writer task, so the reconciliation path never waits on the store. Write
//! failures are logged and dropped: rep-index sequence, not insertion
//! order in the store, is the source of truth. The queue drains fully once
//! every sender is dropped, which makes shutdown draining explicit.

use repsense_common::db;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default bound on the write queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One unit of deferred store work
#[derive(Debug, Clone, PartialEq)]
pub enum PersistRequest {
    InsertRep {
        set_id: i64,
        rep_index: i64,
        t_ms_start: i64,
        t_ms_end: i64,
        peak_amag: f64,
        tempo_ms: Option<i64>,
    },
    CloseSet {
        set_id: i64,
        actual_reps: i64,
        avg_tempo_ms: Option<i64>,
    },
}

/// Spawn the writer task. Await the returned handle after dropping all
/// senders to drain outstanding writes at shutdown.
pub fn spawn_writer(
    pool: SqlitePool,
    capacity: usize,
) -> (mpsc::Sender<PersistRequest>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(run_writer(pool, rx));
    (tx, task)
}

async fn run_writer(pool: SqlitePool, mut rx: mpsc::Receiver<PersistRequest>) {
    while let Some(request) = rx.recv().await {
        if let Err(e) = apply(&pool, &request).await {
            warn!(error = %e, ?request, "persistence request failed; dropping");
        }
    }
    debug!("persistence queue drained");
}

async fn apply(pool: &SqlitePool, request: &PersistRequest) -> repsense_common::Result<()> {
    match request {
        PersistRequest::InsertRep {
            set_id,
            rep_index,
            t_ms_start,
            t_ms_end,
            peak_amag,
            tempo_ms,
        } => {
            db::reps::insert_rep(
                pool, *set_id, *rep_index, *t_ms_start, *t_ms_end, *peak_amag, *tempo_ms,
            )
            .await
        }
        PersistRequest::CloseSet {
            set_id,
            actual_reps,
            avg_tempo_ms,
        } => db::sets::update_set(pool, *set_id, *actual_reps, *avg_tempo_ms).await,
    }
}
