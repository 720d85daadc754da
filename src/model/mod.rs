//! Race Domain Model
//!
//! Drivers, teams, standings and the session-wide conditions the
//! dashboard renders. These are the types held by the state store; raw
//! OpenF1 records live in [`crate::openf1`] and are mapped into these by the
//! feed.

pub mod mock;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gap string shown for the race leader
pub const LEADER_GAP: &str = "LEADER";

/// Colour used when the API has no team colour
pub const DEFAULT_TEAM_COLOUR: &str = "525252";

/// A driver entered in the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// Three-letter acronym (e.g. "VER")
    pub id: String,
    /// Full name
    pub name: String,
    /// Car number
    pub number: u32,
    /// Team id slug
    pub team: String,
    /// Country code, empty when unknown
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// A constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    /// Display colour as `#RRGGBB`
    pub color: String,
}

impl Team {
    /// Build a team from its display name and an optional raw hex colour
    pub fn from_name(name: &str, colour: Option<&str>) -> Self {
        let colour = colour
            .map(|c| c.trim_start_matches('#'))
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_TEAM_COLOUR);

        Self {
            id: team_slug(name),
            name: name.to_string(),
            color: format!("#{}", colour),
        }
    }
}

/// Turn a team name into its id slug ("Red Bull Racing" -> "red-bull-racing")
pub fn team_slug(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Latest car telemetry sample for one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// km/h
    pub speed: f64,
    pub rpm: u32,
    pub gear: u8,
    /// Throttle application, 0-100
    pub throttle: f64,
    /// Brake application, 0-100
    pub brake: f64,
    pub drs: bool,
    /// Seconds behind the leader
    pub delta: f64,
}

/// Tyre compound of the current stint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TyreCompound {
    Soft,
    Medium,
    Hard,
    #[serde(rename = "inter")]
    Intermediate,
    Wet,
}

impl TyreCompound {
    /// Parse the compound names used by OpenF1 stints
    pub fn from_api(compound: &str) -> Option<Self> {
        match compound.trim().to_uppercase().as_str() {
            "SOFT" => Some(Self::Soft),
            "MEDIUM" => Some(Self::Medium),
            "HARD" => Some(Self::Hard),
            "INTERMEDIATE" => Some(Self::Intermediate),
            "WET" => Some(Self::Wet),
            _ => None,
        }
    }
}

/// Sector durations of the latest completed lap, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorTimes {
    pub s1: Option<f64>,
    pub s2: Option<f64>,
    pub s3: Option<f64>,
}

/// One row of the standings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub position: u32,
    pub driver: Driver,
    pub team: Team,
    pub points: u32,
    pub wins: u32,
    /// Formatted `m:ss.mmm`
    pub last_lap_time: Option<String>,
    /// `+s.mmm`, a lapped marker such as `+1 LAP`, or `LEADER`
    pub gap: Option<String>,
    pub is_fastest_lap: bool,
    pub telemetry: Option<Telemetry>,
    #[serde(default)]
    pub sectors: SectorTimes,
    pub tyre: Option<TyreCompound>,
    pub pitstops: u32,
}

impl Standing {
    /// Create a standing with no race data yet
    pub fn new(position: u32, driver: Driver, team: Team) -> Self {
        Self {
            position,
            driver,
            team,
            points: 0,
            wins: 0,
            last_lap_time: None,
            gap: None,
            is_fastest_lap: false,
            telemetry: None,
            sectors: SectorTimes::default(),
            tyre: None,
            pitstops: 0,
        }
    }

    /// Whether this row currently shows the leader marker
    pub fn is_leader(&self) -> bool {
        self.gap.as_deref() == Some(LEADER_GAP)
    }
}

/// A round of the championship calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub name: String,
    pub circuit: String,
    pub country: String,
    pub date: String,
    pub round: u32,
}

/// Track surface condition derived from weather
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackCondition {
    Dry,
    Damp,
    Wet,
}

/// Flag status derived from race-control messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagStatus {
    Green,
    Yellow,
    SafetyCar,
    Vsc,
    Red,
}

impl fmt::Display for FlagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlagStatus::Green => "green",
            FlagStatus::Yellow => "yellow",
            FlagStatus::SafetyCar => "safety-car",
            FlagStatus::Vsc => "vsc",
            FlagStatus::Red => "red",
        };
        write!(f, "{}", s)
    }
}

/// Session-wide conditions, last write wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConditions {
    pub track_condition: TrackCondition,
    pub flag_status: FlagStatus,
    /// Air temperature in whole degrees Celsius
    pub air_temp: i32,
    /// Track temperature in whole degrees Celsius
    pub track_temp: i32,
}

impl Default for SessionConditions {
    fn default() -> Self {
        Self {
            track_condition: TrackCondition::Dry,
            flag_status: FlagStatus::Green,
            air_temp: 24,
            track_temp: 38,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_slug() {
        assert_eq!(team_slug("Red Bull Racing"), "red-bull-racing");
        assert_eq!(team_slug("  Haas F1   Team "), "haas-f1-team");
        assert_eq!(team_slug("McLaren"), "mclaren");
    }

    #[test]
    fn test_team_colour_default() {
        let team = Team::from_name("Kick Sauber", None);
        assert_eq!(team.id, "kick-sauber");
        assert_eq!(team.color, "#525252");

        let team = Team::from_name("Ferrari", Some("E8002D"));
        assert_eq!(team.color, "#E8002D");

        let team = Team::from_name("Ferrari", Some(""));
        assert_eq!(team.color, "#525252");
    }

    #[test]
    fn test_tyre_compound_from_api() {
        assert_eq!(TyreCompound::from_api("SOFT"), Some(TyreCompound::Soft));
        assert_eq!(TyreCompound::from_api("intermediate"), Some(TyreCompound::Intermediate));
        assert_eq!(TyreCompound::from_api("WET"), Some(TyreCompound::Wet));
        assert_eq!(TyreCompound::from_api("UNKNOWN"), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&FlagStatus::SafetyCar).unwrap(),
            "\"safety-car\""
        );
        assert_eq!(
            serde_json::to_string(&TyreCompound::Intermediate).unwrap(),
            "\"inter\""
        );
        assert_eq!(FlagStatus::Vsc.to_string(), "vsc");
    }
}
