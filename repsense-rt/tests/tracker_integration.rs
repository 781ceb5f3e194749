//! End-to-end tracker tests: frames and control through the actor queue
//!
//! Exercises the full path from submitted frames to broadcast events and
//! persisted records, with a scratch database per test.

use repsense_common::db;
use repsense_common::events::{EventBus, TrackerEvent};
use repsense_common::TelemetryFrame;
use repsense_rt::persist;
use repsense_rt::publish::Publisher;
use repsense_rt::tracker::{self, EndSetRequest, StartSetRequest, TrackerHandle};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::task::JoinHandle;

struct Harness {
    _dir: TempDir,
    pool: SqlitePool,
    bus: EventBus,
    handle: TrackerHandle,
    tracker_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

async fn harness() -> Harness {
    let dir = TempDir::new().expect("create temp dir");
    let pool = db::init_database(&dir.path().join("repsense.db"))
        .await
        .expect("init database");
    let session_id =
        db::sessions::create_session(&pool, "test-device", repsense_common::time::now(), None)
            .await
            .expect("create session");

    let bus = EventBus::new(1024);
    let (persist_tx, writer_task) = persist::spawn_writer(pool.clone(), 64);
    let publisher = Publisher::new(bus.clone(), persist_tx);
    let (handle, tracker_task) =
        tracker::spawn(session_id, pool.clone(), publisher, "gyro_reps", 64);

    Harness {
        _dir: dir,
        pool,
        bus,
        handle,
        tracker_task,
        writer_task,
    }
}

impl Harness {
    /// Drop the tracker handle and wait for the tracker and the
    /// persistence queue to drain.
    async fn drain(self) -> (TempDir, SqlitePool, EventBus) {
        drop(self.handle);
        self.tracker_task.await.expect("tracker task");
        self.writer_task.await.expect("writer task");
        (self._dir, self.pool, self.bus)
    }
}

fn frame(t_ms: i64, reps: i64) -> TelemetryFrame {
    TelemetryFrame::new(t_ms, 1.0 + t_ms as f64 / 10_000.0).with_counter("gyro_reps", reps)
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn reps_flow_to_store_and_observers() {
    let h = harness().await;
    let mut rx = h.bus.subscribe();

    // Counter observed before the set starts: baseline material only
    assert!(h.handle.submit_frame(frame(0, 0)).await);

    let started = h
        .handle
        .start_set(StartSetRequest {
            exercise_name: Some("bench press".into()),
            target_reps: Some(5),
            ..Default::default()
        })
        .await
        .expect("start set");
    assert!(started.auto_closed.is_none());

    assert!(h.handle.submit_frame(frame(100, 1)).await);
    assert!(h.handle.submit_frame(frame(200, 1)).await);
    // Jump of two units in one frame
    assert!(h.handle.submit_frame(frame(300, 3)).await);

    let closed = h
        .handle
        .end_set(EndSetRequest::default())
        .await
        .expect("end set")
        .expect("a set was active");
    assert_eq!(closed.set_id, started.set_id);
    assert_eq!(closed.actual_reps, 3);
    assert!(closed.avg_tempo_ms.is_some());

    let (_dir, pool, _bus) = h.drain().await;

    let reps = db::reps::list_reps(&pool, closed.set_id).await.unwrap();
    let indices: Vec<i64> = reps.iter().map(|r| r.rep_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    // Both synthesized reps carry the jumping frame's timestamp
    assert_eq!(reps[1].t_ms_end, 300);
    assert_eq!(reps[2].t_ms_end, 300);

    let set = db::sets::get_set(&pool, closed.set_id).await.unwrap();
    assert_eq!(set.exercise_name.as_deref(), Some("bench press"));
    assert_eq!(set.target_reps, Some(5));
    assert_eq!(set.actual_reps, Some(3));
    assert!(set.avg_tempo_ms.is_some());

    let events = drain_events(&mut rx);
    let rep_indices: Vec<i64> = events
        .iter()
        .filter_map(|e| match e {
            TrackerEvent::RepEvent { rep_index, .. } => Some(*rep_index),
            _ => None,
        })
        .collect();
    assert_eq!(rep_indices, vec![1, 2, 3]);

    let frames = events
        .iter()
        .filter(|e| matches!(e, TrackerEvent::Frame { .. }))
        .count();
    assert_eq!(frames, 4);

    assert!(events
        .iter()
        .any(|e| matches!(e, TrackerEvent::SetStarted { set_id, .. } if *set_id == closed.set_id)));
    assert!(events.iter().any(
        |e| matches!(e, TrackerEvent::SetEnded { actual_reps, .. } if *actual_reps == 3)
    ));
}

#[tokio::test]
async fn end_without_active_set_is_noop() {
    let h = harness().await;

    let closed = h
        .handle
        .end_set(EndSetRequest {
            reps_observed: Some(10),
            ..Default::default()
        })
        .await
        .expect("end set");
    assert!(closed.is_none());

    let (_dir, pool, _bus) = h.drain().await;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sets")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn second_start_auto_closes_prior_set() {
    let h = harness().await;

    assert!(h.handle.submit_frame(frame(0, 0)).await);
    let first = h
        .handle
        .start_set(StartSetRequest::default())
        .await
        .unwrap();
    assert!(h.handle.submit_frame(frame(100, 2)).await);

    let second = h
        .handle
        .start_set(StartSetRequest::default())
        .await
        .unwrap();
    let auto_closed = second.auto_closed.expect("prior set auto-closed");
    assert_eq!(auto_closed.set_id, first.set_id);
    assert_eq!(auto_closed.actual_reps, 2);

    // Baseline reset: the next advance is rep 1 of the new set
    assert!(h.handle.submit_frame(frame(200, 3)).await);
    let closed = h
        .handle
        .end_set(EndSetRequest::default())
        .await
        .unwrap()
        .expect("second set active");
    assert_eq!(closed.set_id, second.set_id);
    assert_eq!(closed.actual_reps, 1);

    let (_dir, pool, _bus) = h.drain().await;

    let prior = db::sets::get_set(&pool, first.set_id).await.unwrap();
    assert_eq!(prior.actual_reps, Some(2));

    let reps = db::reps::list_reps(&pool, second.set_id).await.unwrap();
    assert_eq!(reps.len(), 1);
    assert_eq!(reps[0].rep_index, 1);
}

#[tokio::test]
async fn engine_stop_reported_but_set_stays_open() {
    let h = harness().await;
    let mut rx = h.bus.subscribe();

    assert!(h.handle.submit_frame(frame(0, 0)).await);
    let started = h
        .handle
        .start_set(StartSetRequest::default())
        .await
        .unwrap();

    h.handle.engine_stopped().await;

    let status = h.handle.status().await.unwrap();
    assert!(!status.engine_running);
    let active = status.active_set.expect("set remains open");
    assert_eq!(active.set_id, started.set_id);

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, TrackerEvent::EngineStopped { .. })));

    h.drain().await;
}

#[tokio::test]
async fn counter_regression_keeps_indices_contiguous() {
    let h = harness().await;
    let mut rx = h.bus.subscribe();

    assert!(h.handle.submit_frame(frame(0, 5)).await);
    h.handle
        .start_set(StartSetRequest::default())
        .await
        .unwrap();
    assert!(h.handle.submit_frame(frame(100, 7)).await);

    // Engine restarts: counter falls back to zero
    assert!(h.handle.submit_frame(frame(200, 0)).await);
    assert!(h.handle.submit_frame(frame(300, 1)).await);

    let closed = h
        .handle
        .end_set(EndSetRequest::default())
        .await
        .unwrap()
        .expect("set active");
    assert_eq!(closed.actual_reps, 3);

    let (_dir, pool, _bus) = h.drain().await;

    let reps = db::reps::list_reps(&pool, closed.set_id).await.unwrap();
    let indices: Vec<i64> = reps.iter().map(|r| r.rep_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        TrackerEvent::EngineRestarted {
            previous_counter: 7,
            observed_counter: 0,
            ..
        }
    )));
}
