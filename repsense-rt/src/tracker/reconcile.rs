//! Rep reconciliation: global counter advances become within-set rep events
//!
//! The engine's counter is global and ever-increasing across its run; a
//! set sees only the slice above its baseline. A single frame may advance
//! the counter by more than one (missed frames upstream, engine
//! under-sampling), in which case one rep event is synthesized per unit,
//! all carrying that frame's timestamp and magnitude.

use std::time::Instant;

use repsense_common::TelemetryFrame;

use super::lifecycle::SetLifecycle;

/// One reconciled repetition within the active set.
#[derive(Debug, Clone, PartialEq)]
pub struct RepObservation {
    pub set_id: i64,
    /// Within-set index, 1-based and contiguous
    pub rep_index: i64,
    pub tempo_ms: u64,
    /// Sensor timestamp of the frame that produced this rep
    pub t_ms: i64,
    pub peak_amag: f64,
}

/// Reported when the counter moves backwards (engine restart).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRegression {
    pub previous: i64,
    pub observed: i64,
}

/// Result of reconciling one frame.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    pub reps: Vec<RepObservation>,
    pub regression: Option<CounterRegression>,
}

impl SetLifecycle {
    /// Reconcile one frame against the lifecycle state.
    ///
    /// The last-observed counter is updated unconditionally, active set or
    /// not. Rep events are produced only while a set is active. A counter
    /// decrease produces no rep events and no negative deltas; the active
    /// set is re-baselined so its index sequence stays contiguous across
    /// the restart.
    pub fn reconcile_frame(&mut self, frame: &TelemetryFrame, now: Instant) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        let Some(value) = frame.counter(&self.counter_field) else {
            return outcome;
        };

        // The set may have started before any frame arrived; the first
        // observation then defines its baseline.
        if let Some(set) = &mut self.active {
            if set.baseline.is_none() {
                set.baseline = Some(self.last_counter.unwrap_or(value));
            }
        }

        match self.last_counter {
            Some(last) if value > last => {
                if let Some(set) = &mut self.active {
                    let baseline = set.baseline.unwrap_or(last);
                    for global in (last + 1)..=value {
                        let rep_index = global - baseline;
                        let tempo_ms = set.tempo.lap(now);
                        set.reps_recorded = rep_index;
                        outcome.reps.push(RepObservation {
                            set_id: set.set_id,
                            rep_index,
                            tempo_ms,
                            t_ms: frame.t_ms,
                            peak_amag: frame.amag,
                        });
                    }
                }
                self.last_counter = Some(value);
            }
            Some(last) if value < last => {
                outcome.regression = Some(CounterRegression {
                    previous: last,
                    observed: value,
                });
                if let Some(set) = &mut self.active {
                    set.baseline = Some(value - set.reps_recorded);
                }
                self.last_counter = Some(value);
            }
            _ => {
                self.last_counter = Some(value);
            }
        }

        outcome
    }
}
