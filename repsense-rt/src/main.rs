//! Rep Tracker (repsense-rt) - Main entry point
//!
//! Wires the frame ingest, tracker actor, persistence writer, and HTTP/SSE
//! server together. The only faults that terminate the process are startup
//! faults: bad configuration, an unopenable database, or failure to create
//! the session record.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repsense_common::db;
use repsense_common::events::EventBus;
use repsense_rt::api;
use repsense_rt::config::{Config, FrameSourceConfig};
use repsense_rt::ingest;
use repsense_rt::persist;
use repsense_rt::publish::Publisher;
use repsense_rt::tracker;
use repsense_rt::Error;

/// Command-line arguments for repsense-rt
#[derive(Parser, Debug)]
#[command(name = "repsense-rt")]
#[command(about = "Rep tracker service for Repsense")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5850", env = "REPSENSE_RT_PORT")]
    port: u16,

    /// Path to the SQLite database file
    #[arg(long, default_value = "repsense.db", env = "REPSENSE_DB_PATH")]
    db_path: PathBuf,

    /// Device identifier recorded on the session
    #[arg(long, default_value = "unknown-device", env = "REPSENSE_DEVICE_ID")]
    device_id: String,

    /// Frame counter field used for rep counting
    #[arg(long, default_value = "gyro_reps", env = "REPSENSE_COUNTER_FIELD")]
    counter_field: String,

    /// Free-text note recorded on the session
    #[arg(long, env = "REPSENSE_SESSION_NOTES")]
    session_notes: Option<String>,

    /// Command line that launches the signal-processing engine
    #[arg(long, env = "REPSENSE_ENGINE_CMD")]
    engine_cmd: Option<String>,

    /// Replay a recorded frame file instead of spawning the engine
    #[arg(long, env = "REPSENSE_REPLAY_FILE", conflicts_with = "engine_cmd")]
    replay_file: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> repsense_rt::Result<Config> {
        let source = match (self.engine_cmd, self.replay_file) {
            (Some(cmd), None) => {
                let mut parts = cmd.split_whitespace().map(String::from);
                let command = parts
                    .next()
                    .ok_or_else(|| Error::Config("engine command is empty".into()))?;
                FrameSourceConfig::Engine {
                    command,
                    args: parts.collect(),
                }
            }
            (None, Some(path)) => FrameSourceConfig::Replay { path },
            _ => {
                return Err(Error::Config(
                    "exactly one of --engine-cmd or --replay-file is required".into(),
                ))
            }
        };
        Ok(Config {
            port: self.port,
            db_path: self.db_path,
            device_id: self.device_id,
            counter_field: self.counter_field,
            session_notes: self.session_notes,
            source,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repsense_rt=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse()
        .into_config()
        .context("Invalid configuration")?;

    info!(
        "Starting Repsense Rep Tracker v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.port
    );

    // Durable store: open + schema, then the session record for this run
    let db_pool = db::init_database(&config.db_path)
        .await
        .context("Failed to initialize database")?;

    let session_id = db::sessions::create_session(
        &db_pool,
        &config.device_id,
        repsense_common::time::now(),
        config.session_notes.as_deref(),
    )
    .await
    .context("Failed to create session record")?;
    info!(session_id, device_id = %config.device_id, "Session established");

    // Fan-out: observer bus + bounded persistence queue
    let bus = EventBus::new(1024);
    let (persist_tx, writer_task) =
        persist::spawn_writer(db_pool.clone(), persist::DEFAULT_QUEUE_CAPACITY);
    let publisher = Publisher::new(bus.clone(), persist_tx);

    // Tracker actor: owns the lifecycle state, consumes frames + control
    let (tracker_handle, tracker_task) = tracker::spawn(
        session_id,
        db_pool.clone(),
        publisher,
        config.counter_field.clone(),
        512,
    );

    // Frame ingest feeds the tracker until the engine stops
    let ingest_tracker = tracker_handle.clone();
    let source = config.source.clone();
    let ingest_task = tokio::spawn(async move {
        if let Err(e) = ingest::run(source, ingest_tracker).await {
            warn!("Frame ingest ended with error: {}", e);
        }
    });

    // Serve control + SSE until a shutdown signal arrives
    let ctx = api::AppContext {
        tracker: tracker_handle.clone(),
        bus,
    };
    api::server::run(&config, ctx, shutdown_signal())
        .await
        .context("Server error")?;

    // Drain: stop ingest, let the tracker finish queued messages, then let
    // the persistence queue empty before exit.
    ingest_task.abort();
    drop(tracker_handle);
    if tracker_task.await.is_err() {
        warn!("Tracker task ended abnormally");
    }
    if writer_task.await.is_err() {
        warn!("Persistence writer ended abnormally");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
