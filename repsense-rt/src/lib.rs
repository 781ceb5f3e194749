//! # Repsense Rep Tracker (repsense-rt)
//!
//! Reconciles the signal-processing engine's raw rep counter into
//! per-set, tempo-annotated rep events, scoped to the active exercise set.
//!
//! **Purpose:** ingest line-delimited telemetry frames, drive the
//! session/set lifecycle, broadcast frames and rep events to SSE
//! observers, and persist sessions/sets/reps asynchronously.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod persist;
pub mod publish;
pub mod tracker;

pub use error::{Error, Result};
