//! HTTP request handlers
//!
//! Implements the set-control endpoints and status surface. Control bodies
//! carry the display client's view (`client_ts`, `reps_gyro`); the tracker
//! reconciles them against its own state.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::server::AppContext;
use crate::tracker::{EndSetRequest, StartSetRequest, TrackerStatus};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSetBody {
    pub exercise_name: Option<String>,
    pub target_reps: Option<i64>,
    pub client_ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StartSetResponse {
    status: String,
    set_id: i64,
    /// Id of a prior set that was still open and got auto-closed
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_closed_set_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct EndSetBody {
    /// Rep count as seen by the display client
    pub reps_gyro: Option<i64>,
    pub client_ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EndSetResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    set_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_reps: Option<i64>,
    /// Null when the set recorded no reps
    avg_tempo_ms: Option<u64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "rep_tracker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/set/start - Begin a new set
pub async fn start_set(
    State(ctx): State<AppContext>,
    Json(body): Json<StartSetBody>,
) -> Result<Json<StartSetResponse>, (StatusCode, Json<StatusResponse>)> {
    let request = StartSetRequest {
        exercise_name: body.exercise_name,
        target_reps: body.target_reps,
        client_ts: body.client_ts,
    };
    match ctx.tracker.start_set(request).await {
        Ok(started) => Ok(Json(StartSetResponse {
            status: "started".to_string(),
            set_id: started.set_id,
            auto_closed_set_id: started.auto_closed.map(|closed| closed.set_id),
        })),
        Err(e) => {
            error!("start_set failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("error: {e}"),
                }),
            ))
        }
    }
}

/// POST /api/set/end - Close the active set
///
/// Closing with no active set is a warning-level no-op, reported as
/// `no_active_set` with a 200, not an error.
pub async fn end_set(
    State(ctx): State<AppContext>,
    Json(body): Json<EndSetBody>,
) -> Result<Json<EndSetResponse>, (StatusCode, Json<StatusResponse>)> {
    let request = EndSetRequest {
        reps_observed: body.reps_gyro,
        client_ts: body.client_ts,
    };
    match ctx.tracker.end_set(request).await {
        Ok(Some(closed)) => Ok(Json(EndSetResponse {
            status: "ended".to_string(),
            set_id: Some(closed.set_id),
            actual_reps: Some(closed.actual_reps),
            avg_tempo_ms: closed.avg_tempo_ms,
        })),
        Ok(None) => Ok(Json(EndSetResponse {
            status: "no_active_set".to_string(),
            set_id: None,
            actual_reps: None,
            avg_tempo_ms: None,
        })),
        Err(e) => {
            error!("end_set failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("error: {e}"),
                }),
            ))
        }
    }
}

/// GET /api/status - Lifecycle snapshot
pub async fn status(
    State(ctx): State<AppContext>,
) -> Result<Json<TrackerStatus>, (StatusCode, Json<StatusResponse>)> {
    match ctx.tracker.status().await {
        Ok(status) => Ok(Json(status)),
        Err(e) => {
            error!("status query failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse {
                    status: format!("error: {e}"),
                }),
            ))
        }
    }
}
