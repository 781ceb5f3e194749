//! Fan-out of frames and derived events to observers and persistence
//!
//! Both paths are non-blocking from the tracker's point of view: broadcast
//! is lossy per observer, and persistence hand-off is a bounded `try_send`
//! that drops with a diagnostic when the write queue is full. The
//! reconciliation path never waits on either.

use repsense_common::events::{EventBus, TrackerEvent};
use repsense_common::{time, TelemetryFrame};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::persist::PersistRequest;
use crate::tracker::{ClosedSet, CounterRegression, RepObservation};

/// Pushes every frame and derived event to subscribed observers and hands
/// records to the persistence writer.
#[derive(Clone)]
pub struct Publisher {
    bus: EventBus,
    persist_tx: mpsc::Sender<PersistRequest>,
}

impl Publisher {
    pub fn new(bus: EventBus, persist_tx: mpsc::Sender<PersistRequest>) -> Self {
        Self { bus, persist_tx }
    }

    /// Republish a raw telemetry frame to observers. Frames have no record
    /// kind in the store, so nothing is persisted here.
    pub fn publish_frame(&self, frame: &TelemetryFrame) {
        self.bus.emit_lossy(TrackerEvent::from_frame(frame));
    }

    /// Broadcast one reconciled rep and queue its record for insertion.
    pub fn publish_rep(&self, rep: &RepObservation) {
        self.bus.emit_lossy(TrackerEvent::RepEvent {
            set_id: rep.set_id,
            rep_index: rep.rep_index,
            tempo_ms: Some(rep.tempo_ms),
            t_ms: rep.t_ms,
            peak_amag: rep.peak_amag,
        });
        self.persist(PersistRequest::InsertRep {
            set_id: rep.set_id,
            rep_index: rep.rep_index,
            t_ms_start: rep.t_ms - rep.tempo_ms as i64,
            t_ms_end: rep.t_ms,
            peak_amag: rep.peak_amag,
            tempo_ms: Some(rep.tempo_ms as i64),
        });
    }

    pub fn publish_set_started(
        &self,
        set_id: i64,
        exercise_name: Option<String>,
        target_reps: Option<i64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) {
        self.bus.emit_lossy(TrackerEvent::SetStarted {
            set_id,
            exercise_name,
            target_reps,
            timestamp,
        });
    }

    /// Broadcast a set's closing summary and queue the summary update.
    pub fn publish_set_ended(&self, closed: &ClosedSet) {
        self.bus.emit_lossy(TrackerEvent::SetEnded {
            set_id: closed.set_id,
            actual_reps: closed.actual_reps,
            avg_tempo_ms: closed.avg_tempo_ms,
            timestamp: time::now(),
        });
        self.persist(PersistRequest::CloseSet {
            set_id: closed.set_id,
            actual_reps: closed.actual_reps,
            avg_tempo_ms: closed.avg_tempo_ms.map(|ms| ms as i64),
        });
    }

    pub fn publish_engine_stopped(&self) {
        self.bus.emit_lossy(TrackerEvent::EngineStopped {
            timestamp: time::now(),
        });
    }

    pub fn publish_engine_restarted(&self, regression: CounterRegression) {
        self.bus.emit_lossy(TrackerEvent::EngineRestarted {
            previous_counter: regression.previous,
            observed_counter: regression.observed,
            timestamp: time::now(),
        });
    }

    fn persist(&self, request: PersistRequest) {
        match self.persist_tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                warn!(?request, "persistence queue full; dropping request");
            }
            Err(TrySendError::Closed(request)) => {
                warn!(?request, "persistence writer gone; dropping request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(index: i64) -> RepObservation {
        RepObservation {
            set_id: 1,
            rep_index: index,
            tempo_ms: 500,
            t_ms: 1500,
            peak_amag: 1.2,
        }
    }

    #[tokio::test]
    async fn publish_rep_broadcasts_and_queues_record() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(16);
        let publisher = Publisher::new(bus.clone(), tx);
        let mut events = bus.subscribe();

        publisher.publish_rep(&rep(1));

        match events.recv().await.unwrap() {
            TrackerEvent::RepEvent {
                rep_index,
                tempo_ms,
                ..
            } => {
                assert_eq!(rep_index, 1);
                assert_eq!(tempo_ms, Some(500));
            }
            other => panic!("unexpected event {other:?}"),
        }

        match rx.recv().await.unwrap() {
            PersistRequest::InsertRep {
                rep_index,
                t_ms_start,
                t_ms_end,
                ..
            } => {
                assert_eq!(rep_index, 1);
                assert_eq!(t_ms_start, 1000);
                assert_eq!(t_ms_end, 1500);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[tokio::test]
    async fn full_persistence_queue_drops_without_blocking() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(1);
        let publisher = Publisher::new(bus, tx);

        // Second request finds the queue full and is dropped
        publisher.publish_rep(&rep(1));
        publisher.publish_rep(&rep(2));

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
