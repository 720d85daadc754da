//! OpenF1 Integration
//!
//! Read-only access to the public OpenF1 REST API.
//!
//! ## Architecture
//!
//! - **Client**: reqwest-based HTTP client, one GET per call
//! - **Types**: raw record rows for each endpoint
//! - **RaceDataSource**: the operations the feed needs, so it can run against
//!   the HTTP client or an in-memory source

mod client;
mod types;

pub use client::{format_since, ClientConfig, Endpoint, FetchError, OpenF1Client, Params};
pub use types::{
    CarData, DriverRecord, GapValue, IntervalRecord, LapRecord, PositionRecord, RaceControlRecord,
    Session, SessionKey, SessionQuery, StintRecord, WeatherRecord,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of raw race data, one method per endpoint
///
/// Implementations return an empty collection when they are rate limited.
#[async_trait]
pub trait RaceDataSource: Send + Sync {
    /// Search sessions
    async fn sessions(&self, query: SessionQuery) -> Result<Vec<Session>, FetchError>;

    /// Driver roster of a session
    async fn drivers(&self, session: SessionKey) -> Result<Vec<DriverRecord>, FetchError>;

    /// Car telemetry samples for one driver, optionally only those after `since`
    async fn car_data(
        &self,
        session: SessionKey,
        driver_number: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CarData>, FetchError>;

    /// Position changes
    async fn positions(&self, session: SessionKey) -> Result<Vec<PositionRecord>, FetchError>;

    /// Gap and interval samples
    async fn intervals(&self, session: SessionKey) -> Result<Vec<IntervalRecord>, FetchError>;

    /// Completed laps, optionally for one driver
    async fn laps(
        &self,
        session: SessionKey,
        driver_number: Option<u32>,
    ) -> Result<Vec<LapRecord>, FetchError>;

    /// Weather samples
    async fn weather(&self, session: SessionKey) -> Result<Vec<WeatherRecord>, FetchError>;

    /// Tyre stints, optionally for one driver
    async fn stints(
        &self,
        session: SessionKey,
        driver_number: Option<u32>,
    ) -> Result<Vec<StintRecord>, FetchError>;

    /// Race-control messages
    async fn race_control(&self, session: SessionKey)
        -> Result<Vec<RaceControlRecord>, FetchError>;
}
