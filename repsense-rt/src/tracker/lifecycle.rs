//! Session/set lifecycle state machine
//!
//! Two states, reusable for the process lifetime: no active set, or one
//! active set. The context owns everything a frame reconciles against
//! (counter baseline, tempo accumulator, current set id), so serializing
//! access to it serializes the whole core.

use std::time::Instant;

use super::tempo::TempoAccumulator;

/// Summary produced when a set closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSet {
    pub set_id: i64,
    pub actual_reps: i64,
    /// `None` when the set recorded no reps
    pub avg_tempo_ms: Option<u64>,
}

/// Bookkeeping owned by the currently active set.
#[derive(Debug)]
pub(crate) struct ActiveSet {
    pub(crate) set_id: i64,
    /// Global counter value at set start. `None` until a frame has been
    /// observed; captured lazily from the first one in that case.
    pub(crate) baseline: Option<i64>,
    /// Reps reconciled so far; equals the highest within-set index.
    pub(crate) reps_recorded: i64,
    pub(crate) tempo: TempoAccumulator,
}

/// Lifecycle context for set control and frame reconciliation.
#[derive(Debug)]
pub struct SetLifecycle {
    pub(crate) counter_field: String,
    /// Last observed global counter value. Advances whether or not a set
    /// is active, so a baseline captured later reflects true hardware
    /// state.
    pub(crate) last_counter: Option<i64>,
    pub(crate) active: Option<ActiveSet>,
    pub(crate) engine_running: bool,
}

impl SetLifecycle {
    pub fn new(counter_field: impl Into<String>) -> Self {
        Self {
            counter_field: counter_field.into(),
            last_counter: None,
            active: None,
            engine_running: true,
        }
    }

    /// Name of the frame counter used for rep counting
    pub fn counter_field(&self) -> &str {
        &self.counter_field
    }

    /// Last observed global counter value, if any frame has been seen
    pub fn last_counter(&self) -> Option<i64> {
        self.last_counter
    }

    /// Id of the active set, if one is active
    pub fn active_set_id(&self) -> Option<i64> {
        self.active.as_ref().map(|set| set.set_id)
    }

    /// Reps reconciled into the active set so far
    pub fn reps_recorded(&self) -> Option<i64> {
        self.active.as_ref().map(|set| set.reps_recorded)
    }

    pub fn engine_running(&self) -> bool {
        self.engine_running
    }

    pub fn set_engine_running(&mut self, running: bool) {
        self.engine_running = running;
    }

    /// Activate `set_id`: capture the counter baseline from the last
    /// observed value and anchor the tempo clock at `now`.
    ///
    /// A set that is still active gets closed first and its summary
    /// returned, so no bookkeeping is silently abandoned.
    pub fn begin_set(&mut self, set_id: i64, now: Instant) -> Option<ClosedSet> {
        let prior = self.end_set(None);
        self.active = Some(ActiveSet {
            set_id,
            baseline: self.last_counter,
            reps_recorded: 0,
            tempo: TempoAccumulator::new(now),
        });
        prior
    }

    /// Close the active set and return its summary, or `None` when no set
    /// is active (callers treat that as a warning-level no-op).
    ///
    /// `reps_observed` is the display client's count; it wins over the
    /// engine-recorded count when provided.
    pub fn end_set(&mut self, reps_observed: Option<i64>) -> Option<ClosedSet> {
        let set = self.active.take()?;
        Some(ClosedSet {
            set_id: set.set_id,
            actual_reps: reps_observed.unwrap_or(set.reps_recorded),
            avg_tempo_ms: set.tempo.average_ms(),
        })
    }
}
