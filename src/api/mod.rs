//! Read API
//!
//! HTTP surface over the race state store, built with Axum. Everything is
//! read-only; the feed and simulator are the only writers.
//!
//! # Endpoints
//!
//! ## Race
//! - `GET /api/v1/state` - Whole state table
//! - `GET /api/v1/standings` - Classification with feed metadata
//! - `GET /api/v1/standings/:number` - One car by number
//! - `GET /api/v1/drivers` - Driver list
//! - `GET /api/v1/races` - Calendar
//! - `GET /api/v1/session` - Session, conditions and feed status
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /api/v1/ws` - State snapshot stream
//!
//! # Example
//!
//! ```rust,ignore
//! use f1pulse::api::{serve, AppState};
//! use f1pulse::config::ApiConfig;
//! use f1pulse::store::StateStore;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::default();
//!     let state = AppState::new(StateStore::seeded(), config.clone());
//!     serve(state, &config, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::websocket::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api_routes = Router::new()
        .route("/state", get(routes::race::get_state))
        .route("/standings", get(routes::race::list_standings))
        .route("/standings/:number", get(routes::race::get_standing))
        .route("/drivers", get(routes::race::list_drivers))
        .route("/races", get(routes::race::list_races))
        .route("/session", get(routes::race::get_session))
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// CORS for the dashboard origins; any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET])
}

/// Start the API server; returns once `shutdown` is cancelled
pub async fn serve(
    state: AppState,
    config: &ApiConfig,
    shutdown: CancellationToken,
) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(addr = %addr, "f1pulse API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("f1pulse API shut down gracefully");
    Ok(())
}
