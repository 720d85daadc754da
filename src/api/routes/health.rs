//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (there is a table to serve)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Ready once the standings table has rows, seeded or live.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.store.snapshot().standings.is_empty() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.store.snapshot();
    let connected = snapshot.status.connected;

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        connected,
        data_source: snapshot.status.data_source,
        last_update: snapshot.status.last_update,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
