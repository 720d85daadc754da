//! Race Routes
//!
//! Read-only views over the current state snapshot.
//!
//! - GET /api/v1/state - Whole state table
//! - GET /api/v1/standings - Classification
//! - GET /api/v1/standings/:number - One car
//! - GET /api/v1/drivers - Driver list
//! - GET /api/v1/races - Calendar
//! - GET /api/v1/session - Session, conditions, feed status

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{DriversResponse, RacesResponse, SessionResponse, StandingsResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::model::Standing;
use crate::store::RaceState;

/// GET /api/v1/state
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<RaceState> {
    Json(state.store.snapshot().as_ref().clone())
}

/// GET /api/v1/standings
pub async fn list_standings(State(state): State<Arc<AppState>>) -> Json<StandingsResponse> {
    let snapshot = state.store.snapshot();
    Json(StandingsResponse {
        standings: snapshot.standings.clone(),
        count: snapshot.standings.len(),
        is_live: snapshot.is_live,
        data_source: snapshot.status.data_source,
        last_update: snapshot.status.last_update,
    })
}

/// GET /api/v1/standings/:number
pub async fn get_standing(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u32>,
) -> ApiResult<Json<Standing>> {
    state
        .store
        .snapshot()
        .standing(number)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No standing for car {}", number)))
}

/// GET /api/v1/drivers
pub async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<DriversResponse> {
    let snapshot = state.store.snapshot();
    Json(DriversResponse {
        drivers: snapshot.drivers.clone(),
        count: snapshot.drivers.len(),
    })
}

/// GET /api/v1/races
pub async fn list_races(State(state): State<Arc<AppState>>) -> Json<RacesResponse> {
    let snapshot = state.store.snapshot();
    Json(RacesResponse {
        races: snapshot.races.clone(),
        count: snapshot.races.len(),
    })
}

/// GET /api/v1/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let snapshot = state.store.snapshot();
    Json(SessionResponse {
        session: snapshot.status.session.clone(),
        conditions: snapshot.conditions.clone(),
        is_live: snapshot.is_live,
        status: snapshot.status.clone(),
    })
}
