//! repsense-rt specific configuration

use std::path::PathBuf;

/// Rep tracker configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    /// Device identifier recorded on the session
    pub device_id: String,
    /// Frame counter field used for rep counting (e.g. "gyro_reps")
    pub counter_field: String,
    pub session_notes: Option<String>,
    pub source: FrameSourceConfig,
}

/// Where telemetry frames come from
#[derive(Debug, Clone)]
pub enum FrameSourceConfig {
    /// Spawn the signal-processing engine and read its stdout
    Engine { command: String, args: Vec<String> },
    /// Replay a recorded frame file, paced by sensor timestamps
    Replay { path: PathBuf },
}
