//! Event types and broadcast bus for the Repsense services
//!
//! # Architecture
//!
//! Repsense uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many fan-out to observers
//! - **Command channels** (tokio::mpsc): request to a single handler
//!
//! Every inbound telemetry frame and every derived event crosses the
//! EventBus on its way to SSE observers. Broadcast is lossy by design: a
//! slow or disconnected observer lags and drops, it never blocks the
//! producer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::frame::TelemetryFrame;

/// Repsense event types
///
/// Serialized with a `type` tag so observers can demultiplex uniformly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// Raw telemetry frame, re-published to observers as received
    Frame {
        t_ms: i64,
        amag: f64,
        #[serde(flatten)]
        counters: BTreeMap<String, i64>,
    },

    /// One reconciled repetition within the active set
    RepEvent {
        set_id: i64,
        rep_index: i64,
        tempo_ms: Option<u64>,
        t_ms: i64,
        peak_amag: f64,
    },

    /// A set became active
    SetStarted {
        set_id: i64,
        exercise_name: Option<String>,
        target_reps: Option<i64>,
        timestamp: DateTime<Utc>,
    },

    /// A set closed with its summary
    SetEnded {
        set_id: i64,
        actual_reps: i64,
        avg_tempo_ms: Option<u64>,
        timestamp: DateTime<Utc>,
    },

    /// The engine's output stream ended (process exit or EOF)
    EngineStopped { timestamp: DateTime<Utc> },

    /// The engine's global counter moved backwards (engine restart)
    EngineRestarted {
        previous_counter: i64,
        observed_counter: i64,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    /// Build the re-broadcast event for an inbound frame.
    pub fn from_frame(frame: &TelemetryFrame) -> Self {
        TrackerEvent::Frame {
            t_ms: frame.t_ms,
            amag: frame.amag,
            counters: frame.counters.clone(),
        }
    }

    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackerEvent::Frame { .. } => "frame",
            TrackerEvent::RepEvent { .. } => "rep_event",
            TrackerEvent::SetStarted { .. } => "set_started",
            TrackerEvent::SetEnded { .. } => "set_ended",
            TrackerEvent::EngineStopped { .. } => "engine_stopped",
            TrackerEvent::EngineRestarted { .. } => "engine_restarted",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrackerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    ///
    /// Capacity bounds how far a subscriber may lag before it starts
    /// losing events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TrackerEvent,
    ) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// The reconciliation path uses this for everything: correctness never
    /// depends on an observer being connected.
    pub fn emit_lossy(&self, event: TrackerEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(100);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(100);
        let event = TrackerEvent::EngineStopped {
            timestamp: chrono::Utc::now(),
        };

        // Should return error when no subscribers
        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_eventbus_emit_with_subscriber() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let event = TrackerEvent::RepEvent {
            set_id: 1,
            rep_index: 1,
            tempo_ms: Some(500),
            t_ms: 1500,
            peak_amag: 1.2,
        };

        assert!(bus.emit(event).is_ok());

        let received = rx.recv().await.unwrap();
        match received {
            TrackerEvent::RepEvent {
                rep_index,
                tempo_ms,
                ..
            } => {
                assert_eq!(rep_index, 1);
                assert_eq!(tempo_ms, Some(500));
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_eventbus_emit_lossy() {
        let bus = EventBus::new(100);

        // Should not panic even without subscribers
        bus.emit_lossy(TrackerEvent::EngineStopped {
            timestamp: chrono::Utc::now(),
        });
    }

    #[test]
    fn rep_event_wire_format() {
        let event = TrackerEvent::RepEvent {
            set_id: 2,
            rep_index: 3,
            tempo_ms: Some(500),
            t_ms: 1500,
            peak_amag: 1.07,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "rep_event");
        assert_eq!(json["rep_index"], 3);
        assert_eq!(json["tempo_ms"], 500);
        assert_eq!(json["t_ms"], 1500);
    }

    #[test]
    fn zero_rep_set_serializes_null_average() {
        let event = TrackerEvent::SetEnded {
            set_id: 4,
            actual_reps: 0,
            avg_tempo_ms: None,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "set_ended");
        assert!(json["avg_tempo_ms"].is_null());
    }

    #[test]
    fn frame_event_flattens_counters() {
        let frame = crate::frame::TelemetryFrame::new(42, 1.01).with_counter("gyro_reps", 6);
        let json = serde_json::to_value(TrackerEvent::from_frame(&frame)).unwrap();
        assert_eq!(json["type"], "frame");
        assert_eq!(json["t_ms"], 42);
        assert_eq!(json["gyro_reps"], 6);
    }
}
