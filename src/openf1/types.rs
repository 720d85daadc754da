//! OpenF1 record types
//!
//! Raw rows as returned by the REST endpoints. Every endpoint answers with a
//! JSON array of one of these. Any column the API may send as `null` is an
//! `Option`, or falls back to its default, so one odd row never fails a whole
//! array. Some columns (pit-out flag, stint lap range, race control scope) are
//! kept for logging and callers of the client even though the merge skips them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Reads `null` or a missing key as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Session selector accepted by every endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    /// The most recent session known to the API
    Latest,
    Key(u32),
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Latest => write!(f, "latest"),
            SessionKey::Key(key) => write!(f, "{}", key),
        }
    }
}

impl From<u32> for SessionKey {
    fn from(key: u32) -> Self {
        SessionKey::Key(key)
    }
}

/// Filter for the `/sessions` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionQuery {
    /// `session_key=latest`
    Latest,
    /// All sessions of a year, optionally of one type ("Race", "Qualifying", ...)
    Year {
        year: i32,
        session_type: Option<String>,
    },
}

impl SessionQuery {
    pub fn races(year: i32) -> Self {
        SessionQuery::Year {
            year,
            session_type: Some("Race".to_string()),
        }
    }

    pub fn any(year: i32) -> Self {
        SessionQuery::Year {
            year,
            session_type: None,
        }
    }
}

/// `/sessions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_key: u32,
    #[serde(default)]
    pub session_type: String,
    #[serde(default)]
    pub session_name: String,
    pub date_start: DateTime<Utc>,
    pub date_end: DateTime<Utc>,
    #[serde(default)]
    pub meeting_key: u32,
    #[serde(default)]
    pub circuit_short_name: String,
    #[serde(default)]
    pub country_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub year: i32,
}

impl Session {
    /// Whether the session is still running at `now`
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.date_end
    }
}

/// `/drivers`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriverRecord {
    pub driver_number: u32,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub name_acronym: String,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_colour: Option<String>,
    #[serde(default)]
    pub headshot_url: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// `/car_data`, sampled at roughly 4 Hz
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CarData {
    pub date: DateTime<Utc>,
    pub driver_number: u32,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub rpm: u32,
    #[serde(default)]
    pub n_gear: u8,
    #[serde(default)]
    pub throttle: f64,
    #[serde(default)]
    pub brake: f64,
    #[serde(default)]
    pub drs: Option<u32>,
}

/// `/position`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PositionRecord {
    pub date: DateTime<Utc>,
    pub driver_number: u32,
    pub position: u32,
}

/// A gap column from `/intervals`: seconds, or a text marker for lapped cars
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GapValue {
    Seconds(f64),
    Text(String),
}

impl GapValue {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            GapValue::Seconds(s) => Some(*s),
            GapValue::Text(_) => None,
        }
    }
}

/// `/intervals`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntervalRecord {
    pub date: DateTime<Utc>,
    pub driver_number: u32,
    #[serde(default)]
    pub gap_to_leader: Option<GapValue>,
    #[serde(default)]
    pub interval: Option<GapValue>,
}

/// `/laps`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LapRecord {
    pub driver_number: u32,
    pub lap_number: u32,
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lap_duration: Option<f64>,
    #[serde(default)]
    pub duration_sector_1: Option<f64>,
    #[serde(default)]
    pub duration_sector_2: Option<f64>,
    #[serde(default)]
    pub duration_sector_3: Option<f64>,
    #[serde(default)]
    pub is_pit_out_lap: Option<bool>,
}

/// `/weather`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherRecord {
    pub date: DateTime<Utc>,
    pub air_temperature: f64,
    pub track_temperature: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub humidity: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rainfall: f64,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

/// `/stints`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StintRecord {
    pub driver_number: u32,
    pub stint_number: u32,
    #[serde(default)]
    pub compound: Option<String>,
    #[serde(default)]
    pub tyre_age_at_start: Option<u32>,
    #[serde(default)]
    pub lap_start: Option<u32>,
    #[serde(default)]
    pub lap_end: Option<u32>,
}

/// `/race_control`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RaceControlRecord {
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub driver_number: Option<u32>,
}
