//! Frame ingest: engine child process or recorded replay
//!
//! Runs the configured frame source and forwards decoded frames into the
//! tracker's queue. Malformed lines are dropped with a diagnostic and
//! never terminate the stream; end-of-stream is reported to the tracker as
//! "engine stopped", a non-fatal condition.

pub mod replay;

use std::process::Stdio;

use repsense_common::TelemetryFrame;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::FrameSourceConfig;
use crate::error::{Error, Result};
use crate::tracker::TrackerHandle;

/// Run the frame source until it ends, then notify the tracker.
pub async fn run(source: FrameSourceConfig, tracker: TrackerHandle) -> Result<()> {
    match source {
        FrameSourceConfig::Engine { command, args } => {
            run_engine(&command, &args, &tracker).await?;
        }
        FrameSourceConfig::Replay { path } => {
            replay::run(&path, &tracker).await?;
        }
    }
    tracker.engine_stopped().await;
    Ok(())
}

/// Spawn the signal-processing engine and read line-delimited JSON frames
/// from its stdout.
async fn run_engine(command: &str, args: &[String], tracker: &TrackerHandle) -> Result<()> {
    info!(command, "spawning signal-processing engine");

    let mut child = Command::new(command)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| Error::Engine(format!("failed to spawn engine '{command}': {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Engine("engine stdout unavailable".into()))?;
    let mut lines = BufReader::new(stdout).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match TelemetryFrame::parse_line(&line) {
            Ok(frame) => {
                // Tracker gone means the process is shutting down
                if !tracker.submit_frame(frame).await {
                    break;
                }
            }
            Err(e) => warn!(error = %e, line = %line, "dropping malformed telemetry line"),
        }
    }

    match child.wait().await {
        Ok(status) => info!(%status, "engine process exited"),
        Err(e) => warn!(error = %e, "failed to reap engine process"),
    }
    Ok(())
}
