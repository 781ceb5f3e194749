//! # Repsense Common Library
//!
//! Shared code for the Repsense services including:
//! - Telemetry frame type and boundary validation
//! - Event types (TrackerEvent enum) and broadcast bus
//! - Database models and queries
//! - Common error type
//! - Timestamp utilities

pub mod db;
pub mod error;
pub mod events;
pub mod frame;
pub mod time;

pub use error::{Error, Result};
pub use frame::TelemetryFrame;
