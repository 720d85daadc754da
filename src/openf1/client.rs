//! OpenF1 REST API Client
//!
//! HTTP client for the public OpenF1 API. Every endpoint answers a GET with a
//! JSON array. Rate limiting (HTTP 429) is not an error here: the request
//! yields an empty collection and the caller's next poll is the retry.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;

use super::types::*;
use super::RaceDataSource;

/// OpenF1 REST API client
#[derive(Clone)]
pub struct OpenF1Client {
    client: Client,
    config: ClientConfig,
}

/// Configuration for the OpenF1 client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL including the version prefix
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// User-Agent header sent with each request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openf1.org/v1".to_string(),
            request_timeout_ms: 10_000,
            user_agent: format!("f1pulse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The fixed set of endpoints the feed reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Sessions,
    Drivers,
    CarData,
    Position,
    Intervals,
    Laps,
    Weather,
    Stints,
    RaceControl,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Sessions => "/sessions",
            Endpoint::Drivers => "/drivers",
            Endpoint::CarData => "/car_data",
            Endpoint::Position => "/position",
            Endpoint::Intervals => "/intervals",
            Endpoint::Laps => "/laps",
            Endpoint::Weather => "/weather",
            Endpoint::Stints => "/stints",
            Endpoint::RaceControl => "/race_control",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Query string pairs
pub type Params = Vec<(&'static str, String)>;

impl OpenF1Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET an endpoint and decode its JSON array
    ///
    /// Returns an empty collection when the API answers 429.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        params: &[(&'static str, String)],
    ) -> Result<Vec<T>, FetchError> {
        let url = format!("{}{}", self.config.base_url, endpoint.path());

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::Transport { endpoint, source: e })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(endpoint = %endpoint, "OpenF1 rate limited, returning empty result");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| FetchError::Decode { endpoint, source: e })?;

        tracing::trace!(endpoint = %endpoint, rows = rows.len(), "OpenF1 fetch complete");
        Ok(rows)
    }
}

/// Query parameters for a session-scoped endpoint
fn session_params(session: SessionKey) -> Params {
    vec![("session_key", session.to_string())]
}

/// Format a cursor the way the API's `date>` filter expects it
pub fn format_since(since: DateTime<Utc>) -> String {
    since.to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[async_trait]
impl RaceDataSource for OpenF1Client {
    async fn sessions(&self, query: SessionQuery) -> Result<Vec<Session>, FetchError> {
        let params = match query {
            SessionQuery::Latest => session_params(SessionKey::Latest),
            SessionQuery::Year { year, session_type } => {
                let mut params = vec![("year", year.to_string())];
                if let Some(session_type) = session_type {
                    params.push(("session_type", session_type));
                }
                params
            }
        };
        self.fetch(Endpoint::Sessions, &params).await
    }

    async fn drivers(&self, session: SessionKey) -> Result<Vec<DriverRecord>, FetchError> {
        self.fetch(Endpoint::Drivers, &session_params(session)).await
    }

    async fn car_data(
        &self,
        session: SessionKey,
        driver_number: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CarData>, FetchError> {
        let mut params = session_params(session);
        params.push(("driver_number", driver_number.to_string()));
        if let Some(since) = since {
            params.push(("date>", format_since(since)));
        }
        self.fetch(Endpoint::CarData, &params).await
    }

    async fn positions(&self, session: SessionKey) -> Result<Vec<PositionRecord>, FetchError> {
        self.fetch(Endpoint::Position, &session_params(session)).await
    }

    async fn intervals(&self, session: SessionKey) -> Result<Vec<IntervalRecord>, FetchError> {
        self.fetch(Endpoint::Intervals, &session_params(session)).await
    }

    async fn laps(
        &self,
        session: SessionKey,
        driver_number: Option<u32>,
    ) -> Result<Vec<LapRecord>, FetchError> {
        let mut params = session_params(session);
        if let Some(number) = driver_number {
            params.push(("driver_number", number.to_string()));
        }
        self.fetch(Endpoint::Laps, &params).await
    }

    async fn weather(&self, session: SessionKey) -> Result<Vec<WeatherRecord>, FetchError> {
        self.fetch(Endpoint::Weather, &session_params(session)).await
    }

    async fn stints(
        &self,
        session: SessionKey,
        driver_number: Option<u32>,
    ) -> Result<Vec<StintRecord>, FetchError> {
        let mut params = session_params(session);
        if let Some(number) = driver_number {
            params.push(("driver_number", number.to_string()));
        }
        self.fetch(Endpoint::Stints, &params).await
    }

    async fn race_control(
        &self,
        session: SessionKey,
    ) -> Result<Vec<RaceControlRecord>, FetchError> {
        self.fetch(Endpoint::RaceControl, &session_params(session)).await
    }
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when fetching from OpenF1
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenF1 returned {status} on {endpoint}")]
    Status { endpoint: Endpoint, status: u16 },

    #[error("Invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Endpoint the failed request targeted, if it got that far
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            FetchError::Client(_) => None,
            FetchError::Transport { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => Some(*endpoint),
        }
    }
}
