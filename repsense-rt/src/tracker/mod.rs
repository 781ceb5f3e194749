//! Tracker actor: serializes frames and control events over one queue
//!
//! Frame processing and control handling are mutually exclusive critical
//! sections over the lifecycle state. Rather than locking, everything is
//! funneled through a single bounded mpsc queue consumed by one task that
//! owns the [`SetLifecycle`] outright. One frame is fully reconciled,
//! including synthesized multi-rep events, before the next message is
//! taken, so rep-index assignment is deterministic and serial.

pub mod lifecycle;
pub mod reconcile;
pub mod tempo;

pub use lifecycle::{ClosedSet, SetLifecycle};
pub use reconcile::{CounterRegression, FrameOutcome, RepObservation};
pub use tempo::TempoAccumulator;

use std::time::Instant;

use chrono::{DateTime, Utc};
use repsense_common::{db, time, TelemetryFrame};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::publish::Publisher;

/// Messages funneled into the tracker task
#[derive(Debug)]
enum TrackerMsg {
    Frame(TelemetryFrame),
    EngineStopped,
    StartSet {
        req: StartSetRequest,
        reply: oneshot::Sender<Result<StartedSet>>,
    },
    EndSet {
        req: EndSetRequest,
        reply: oneshot::Sender<Option<ClosedSet>>,
    },
    Status {
        reply: oneshot::Sender<TrackerStatus>,
    },
}

/// "start set" control message payload
#[derive(Debug, Clone, Default)]
pub struct StartSetRequest {
    pub exercise_name: Option<String>,
    pub target_reps: Option<i64>,
    pub client_ts: Option<DateTime<Utc>>,
}

/// "end set" control message payload
#[derive(Debug, Clone, Default)]
pub struct EndSetRequest {
    /// Rep count as seen by the display client
    pub reps_observed: Option<i64>,
    pub client_ts: Option<DateTime<Utc>>,
}

/// Reply to a successful "start set"
#[derive(Debug, Clone)]
pub struct StartedSet {
    pub set_id: i64,
    /// Summary of a prior set that was still open and got auto-closed
    pub auto_closed: Option<ClosedSet>,
}

/// Lifecycle snapshot for the status surface
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub session_id: i64,
    pub engine_running: bool,
    pub last_counter: Option<i64>,
    pub active_set: Option<ActiveSetStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveSetStatus {
    pub set_id: i64,
    pub reps_recorded: i64,
}

/// Cloneable handle for submitting frames and control requests.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<TrackerMsg>,
}

impl TrackerHandle {
    /// Queue one frame for reconciliation. Returns false once the tracker
    /// has shut down.
    pub async fn submit_frame(&self, frame: TelemetryFrame) -> bool {
        self.tx.send(TrackerMsg::Frame(frame)).await.is_ok()
    }

    /// Tell the tracker the engine's output stream ended.
    pub async fn engine_stopped(&self) {
        let _ = self.tx.send(TrackerMsg::EngineStopped).await;
    }

    pub async fn start_set(&self, req: StartSetRequest) -> Result<StartedSet> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TrackerMsg::StartSet { req, reply })
            .await
            .map_err(|_| Error::Internal("tracker unavailable".into()))?;
        rx.await
            .map_err(|_| Error::Internal("tracker dropped start_set reply".into()))?
    }

    pub async fn end_set(&self, req: EndSetRequest) -> Result<Option<ClosedSet>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TrackerMsg::EndSet { req, reply })
            .await
            .map_err(|_| Error::Internal("tracker unavailable".into()))?;
        rx.await
            .map_err(|_| Error::Internal("tracker dropped end_set reply".into()))
    }

    pub async fn status(&self) -> Result<TrackerStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(TrackerMsg::Status { reply })
            .await
            .map_err(|_| Error::Internal("tracker unavailable".into()))?;
        rx.await
            .map_err(|_| Error::Internal("tracker dropped status reply".into()))
    }
}

/// Spawn the tracker task.
///
/// The task runs until every [`TrackerHandle`] is dropped, then drains its
/// queue and exits, dropping the publisher (and with it the persistence
/// sender) so the write queue can drain too.
pub fn spawn(
    session_id: i64,
    db_pool: SqlitePool,
    publisher: Publisher,
    counter_field: impl Into<String>,
    queue_capacity: usize,
) -> (TrackerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let tracker = Tracker {
        session_id,
        db_pool,
        lifecycle: SetLifecycle::new(counter_field),
        publisher,
    };
    let task = tokio::spawn(tracker.run(rx));
    (TrackerHandle { tx }, task)
}

struct Tracker {
    session_id: i64,
    db_pool: SqlitePool,
    lifecycle: SetLifecycle,
    publisher: Publisher,
}

impl Tracker {
    async fn run(mut self, mut rx: mpsc::Receiver<TrackerMsg>) {
        info!(
            session_id = self.session_id,
            counter_field = %self.lifecycle.counter_field(),
            "tracker started"
        );
        while let Some(msg) = rx.recv().await {
            match msg {
                TrackerMsg::Frame(frame) => self.handle_frame(frame),
                TrackerMsg::EngineStopped => self.handle_engine_stopped(),
                TrackerMsg::StartSet { req, reply } => {
                    let _ = reply.send(self.handle_start_set(req).await);
                }
                TrackerMsg::EndSet { req, reply } => {
                    let _ = reply.send(self.handle_end_set(req));
                }
                TrackerMsg::Status { reply } => {
                    let _ = reply.send(self.status());
                }
            }
        }
        debug!("tracker queue closed; exiting");
    }

    /// Republish the raw frame, then reconcile it against the lifecycle
    /// state.
    fn handle_frame(&mut self, frame: TelemetryFrame) {
        self.publisher.publish_frame(&frame);

        let outcome = self.lifecycle.reconcile_frame(&frame, Instant::now());

        if let Some(regression) = outcome.regression {
            warn!(
                previous = regression.previous,
                observed = regression.observed,
                "counter regression: engine restarted"
            );
            self.publisher.publish_engine_restarted(regression);
        }

        for rep in &outcome.reps {
            debug!(
                set_id = rep.set_id,
                rep_index = rep.rep_index,
                tempo_ms = rep.tempo_ms,
                "rep reconciled"
            );
            self.publisher.publish_rep(rep);
        }
    }

    fn handle_engine_stopped(&mut self) {
        self.lifecycle.set_engine_running(false);
        if let Some(set_id) = self.lifecycle.active_set_id() {
            warn!(set_id, "engine stream ended; active set receives no further reps");
        } else {
            warn!("engine stream ended");
        }
        self.publisher.publish_engine_stopped();
    }

    /// Create the set record (the store assigns the id), then activate it.
    /// A still-open prior set is auto-closed, not silently abandoned.
    async fn handle_start_set(&mut self, req: StartSetRequest) -> Result<StartedSet> {
        let created_at = req.client_ts.unwrap_or_else(time::now);
        let set_id = db::sets::create_set(
            &self.db_pool,
            self.session_id,
            req.exercise_name.as_deref(),
            req.target_reps,
            created_at,
        )
        .await
        .map_err(|e| Error::Internal(format!("failed to create set record: {e}")))?;

        let auto_closed = self.lifecycle.begin_set(set_id, Instant::now());
        if let Some(closed) = &auto_closed {
            warn!(
                prior_set_id = closed.set_id,
                "start_set while a set was active; auto-closing the prior set"
            );
            self.publisher.publish_set_ended(closed);
        }

        info!(
            set_id,
            exercise = req.exercise_name.as_deref().unwrap_or("-"),
            "set started"
        );
        self.publisher
            .publish_set_started(set_id, req.exercise_name.clone(), req.target_reps, created_at);

        Ok(StartedSet { set_id, auto_closed })
    }

    fn handle_end_set(&mut self, req: EndSetRequest) -> Option<ClosedSet> {
        match self.lifecycle.end_set(req.reps_observed) {
            Some(closed) => {
                info!(
                    set_id = closed.set_id,
                    actual_reps = closed.actual_reps,
                    avg_tempo_ms = ?closed.avg_tempo_ms,
                    "set ended"
                );
                self.publisher.publish_set_ended(&closed);
                Some(closed)
            }
            None => {
                warn!("end_set with no active set; ignoring");
                None
            }
        }
    }

    fn status(&self) -> TrackerStatus {
        TrackerStatus {
            session_id: self.session_id,
            engine_running: self.lifecycle.engine_running(),
            last_counter: self.lifecycle.last_counter(),
            active_set: self.lifecycle.active_set_id().map(|set_id| ActiveSetStatus {
                set_id,
                reps_recorded: self.lifecycle.reps_recorded().unwrap_or(0),
            }),
        }
    }
}
