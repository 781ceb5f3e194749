//! Telemetry frame decoding and boundary validation
//!
//! The signal-processing engine emits one JSON object per line, e.g.:
//!
//! ```text
//! {"t_ms":1500,"amag":1.23,"gyro_reps":4,"accel_reps":3}
//! ```
//!
//! `t_ms` and `amag` are required; everything else is an open set of named
//! rep counters. Validation happens here, at the boundary, so downstream
//! consumers never re-check field shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// One decoded telemetry record from the signal-processing engine.
///
/// Counters are kept in an ordered map so re-broadcast JSON is stable
/// across frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryFrame {
    /// Sensor timestamp in milliseconds (engine clock domain)
    pub t_ms: i64,

    /// Acceleration magnitude in g
    pub amag: f64,

    /// Named rep counters (e.g. `gyro_reps`, `accel_reps`)
    #[serde(flatten)]
    pub counters: BTreeMap<String, i64>,
}

/// Raw line shape before validation. Extra fields land in `extra` and are
/// sifted for integer counters.
#[derive(Debug, Deserialize)]
struct RawFrame {
    t_ms: Option<i64>,
    amag: Option<f64>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl TelemetryFrame {
    /// Construct a frame with no counters.
    pub fn new(t_ms: i64, amag: f64) -> Self {
        Self {
            t_ms,
            amag,
            counters: BTreeMap::new(),
        }
    }

    /// Builder-style counter attachment.
    pub fn with_counter(mut self, name: impl Into<String>, value: i64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    /// Decode and validate one line from the engine's output stream.
    ///
    /// Returns `Err` for anything malformed: non-JSON, a non-object, a
    /// missing required field, or a negative counter value. Callers drop
    /// malformed lines with a diagnostic and keep reading.
    pub fn parse_line(line: &str) -> Result<Self> {
        let raw: RawFrame = serde_json::from_str(line)
            .map_err(|e| Error::InvalidInput(format!("unparseable telemetry line: {e}")))?;

        let t_ms = raw
            .t_ms
            .ok_or_else(|| Error::InvalidInput("telemetry line missing t_ms".into()))?;
        let amag = raw
            .amag
            .ok_or_else(|| Error::InvalidInput("telemetry line missing amag".into()))?;

        let mut counters = BTreeMap::new();
        for (name, value) in raw.extra {
            // Counters are integers; other extra fields are not ours to
            // interpret and are dropped.
            if let Some(n) = value.as_i64() {
                if n < 0 {
                    return Err(Error::InvalidInput(format!(
                        "negative counter {name}={n} in telemetry line"
                    )));
                }
                counters.insert(name, n);
            }
        }

        Ok(Self {
            t_ms,
            amag,
            counters,
        })
    }

    /// Value of a named counter, if the frame carries it.
    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }
}
