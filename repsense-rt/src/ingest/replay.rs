//! Replay of recorded telemetry, paced by sensor timestamps
//!
//! Loops a recorded frame file forever so observers always have data,
//! sleeping between frames to match the recorded `t_ms` spacing, with a
//! short pause between passes.

use std::path::Path;
use std::time::Duration;

use repsense_common::TelemetryFrame;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::tracker::TrackerHandle;

const LOOP_PAUSE: Duration = Duration::from_millis(300);

/// Replay `path` into the tracker until the tracker shuts down.
pub async fn run(path: &Path, tracker: &TrackerHandle) -> Result<()> {
    let frames = load_frames(path)?;
    if frames.is_empty() {
        return Err(Error::Engine(format!(
            "no usable frames in replay file {}",
            path.display()
        )));
    }
    info!(
        count = frames.len(),
        file = %path.display(),
        "replaying recorded telemetry"
    );

    loop {
        let mut last_t: Option<i64> = None;
        for frame in &frames {
            if let Some(last) = last_t {
                let dt = frame.t_ms - last;
                if dt > 0 {
                    tokio::time::sleep(Duration::from_millis(dt as u64)).await;
                }
            }
            last_t = Some(frame.t_ms);
            if !tracker.submit_frame(frame.clone()).await {
                return Ok(());
            }
        }
        tokio::time::sleep(LOOP_PAUSE).await;
    }
}

fn load_frames(path: &Path) -> Result<Vec<TelemetryFrame>> {
    let raw = std::fs::read_to_string(path)?;
    let mut frames = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match TelemetryFrame::parse_line(line) {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!(line = lineno + 1, error = %e, "skipping malformed replay line"),
        }
    }
    Ok(frames)
}
