//! Data Transfer Objects
//!
//! Response types for the read API. Model types are serialized as-is; these
//! wrap them with the feed metadata a dashboard needs alongside.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Driver, Race, SessionConditions, Standing};
use crate::openf1::Session;
use crate::store::{DataSource, FeedStatus};

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` with a live feed, `degraded` on seed or simulated data
    pub status: String,
    pub connected: bool,
    pub data_source: DataSource,
    pub last_update: Option<DateTime<Utc>>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

// ============================================
// RACE DTOs
// ============================================

/// Current classification
#[derive(Debug, Serialize)]
pub struct StandingsResponse {
    pub standings: Vec<Standing>,
    pub count: usize,
    pub is_live: bool,
    pub data_source: DataSource,
    pub last_update: Option<DateTime<Utc>>,
}

/// Driver list
#[derive(Debug, Serialize)]
pub struct DriversResponse {
    pub drivers: Vec<Driver>,
    pub count: usize,
}

/// Race calendar
#[derive(Debug, Serialize)]
pub struct RacesResponse {
    pub races: Vec<Race>,
    pub count: usize,
}

/// Session, conditions and feed status
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Option<Session>,
    pub conditions: SessionConditions,
    pub is_live: bool,
    pub status: FeedStatus,
}
