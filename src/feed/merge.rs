//! Merge Reducers
//!
//! Pure functions that fold one poll's worth of OpenF1 rows into the
//! standings table. Nothing here touches the network or the store; the feed
//! fetches the slices, then runs these inside [`crate::store::StateStore::update`]
//! against whatever state is current at commit time.

use std::collections::{HashMap, HashSet};

use crate::model::{
    Driver, FlagStatus, SectorTimes, SessionConditions, Standing, Team, Telemetry,
    TrackCondition, TyreCompound, LEADER_GAP,
};
use crate::openf1::{
    CarData, DriverRecord, GapValue, IntervalRecord, LapRecord, PositionRecord,
    RaceControlRecord, StintRecord, WeatherRecord,
};

/// DRS channel values meaning the flap is open
const DRS_OPEN: [u32; 3] = [10, 12, 14];

/// Driver roster of the current session, in API order
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<DriverRecord>,
}

impl Roster {
    pub fn new(records: Vec<DriverRecord>) -> Self {
        // The API may repeat a driver; keep the last row
        let mut entries: Vec<DriverRecord> = Vec::with_capacity(records.len());
        for record in records {
            match entries
                .iter_mut()
                .find(|e| e.driver_number == record.driver_number)
            {
                Some(existing) => *existing = record,
                None => entries.push(record),
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.entries.iter().any(|e| e.driver_number == number)
    }

    pub fn records(&self) -> &[DriverRecord] {
        &self.entries
    }

    /// Dashboard drivers for the whole roster
    pub fn drivers(&self) -> Vec<Driver> {
        self.entries.iter().map(driver_from_record).collect()
    }
}

/// Map a roster row to a dashboard driver
pub fn driver_from_record(record: &DriverRecord) -> Driver {
    let team = team_from_record(record);
    Driver {
        id: record.name_acronym.clone(),
        name: record.full_name.clone(),
        number: record.driver_number,
        team: team.id,
        country: record.country_code.clone().unwrap_or_default(),
        photo: record.headshot_url.clone(),
    }
}

/// Map a roster row to its team
pub fn team_from_record(record: &DriverRecord) -> Team {
    Team::from_name(
        record.team_name.as_deref().unwrap_or_default(),
        record.team_colour.as_deref(),
    )
}

/// Rows fetched by one positions poll
#[derive(Debug, Clone, Default)]
pub struct PositionSlices {
    pub positions: Vec<PositionRecord>,
    pub intervals: Vec<IntervalRecord>,
    pub stints: Vec<StintRecord>,
    pub laps: Vec<LapRecord>,
}

/// Last row per driver, in response order
pub fn latest_by_driver<T, F>(rows: &[T], key: F) -> HashMap<u32, &T>
where
    F: Fn(&T) -> u32,
{
    rows.iter().fold(HashMap::new(), |mut acc, row| {
        acc.insert(key(row), row);
        acc
    })
}

/// Completed pit stops per driver: highest stint number seen, minus one
pub fn pitstop_counts(stints: &[StintRecord]) -> HashMap<u32, u32> {
    stints.iter().fold(HashMap::new(), |mut acc, stint| {
        let stops = stint.stint_number.saturating_sub(1);
        let entry = acc.entry(stint.driver_number).or_insert(0);
        *entry = (*entry).max(stops);
        acc
    })
}

/// Driver holding the quickest of the latest laps in this poll
pub fn fastest_lap(latest_laps: &HashMap<u32, &LapRecord>) -> Option<u32> {
    latest_laps
        .iter()
        .filter_map(|(number, lap)| {
            lap.lap_duration
                .filter(|d| *d > 0.0)
                .map(|d| (*number, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(number, _)| number)
}

/// Format a lap duration in seconds as `m:ss.mmm`
pub fn format_lap_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round().max(0.0) as u64;
    let minutes = total_ms / 60_000;
    let rem = total_ms % 60_000;
    format!("{}:{:02}.{:03}", minutes, rem / 1000, rem % 1000)
}

/// Format a gap to the leader
pub fn format_gap(gap: &GapValue) -> String {
    match gap {
        GapValue::Seconds(s) => format!("+{:.3}", s),
        GapValue::Text(text) => text.clone(),
    }
}

/// Whether a DRS channel value means the flap is open
pub fn parse_drs(drs: Option<u32>) -> bool {
    drs.map(|v| DRS_OPEN.contains(&v)).unwrap_or(false)
}

/// Map one car-data sample to a telemetry snapshot
pub fn telemetry_from_sample(sample: &CarData, delta: f64) -> Telemetry {
    Telemetry {
        speed: sample.speed,
        rpm: sample.rpm,
        gear: sample.n_gear,
        throttle: sample.throttle,
        brake: sample.brake,
        drs: parse_drs(sample.drs),
        delta,
    }
}

/// Derive the flag from race-control messages, newest decisive message wins
pub fn flag_from_messages(messages: &[RaceControlRecord]) -> FlagStatus {
    for msg in messages.iter().rev() {
        let flag = msg.flag.as_deref().unwrap_or_default();
        if flag == "RED" {
            return FlagStatus::Red;
        }
        if msg.message.contains("VIRTUAL SAFETY CAR") {
            return FlagStatus::Vsc;
        }
        if msg.message.contains("SAFETY CAR") {
            return FlagStatus::SafetyCar;
        }
        if flag == "YELLOW" || flag == "DOUBLE YELLOW" {
            return FlagStatus::Yellow;
        }
        if flag == "GREEN" {
            return FlagStatus::Green;
        }
    }
    FlagStatus::Green
}

/// Derive track condition from a weather sample
pub fn track_condition(weather: Option<&WeatherRecord>) -> TrackCondition {
    match weather {
        None => TrackCondition::Dry,
        Some(w) if w.rainfall > 0.5 => TrackCondition::Wet,
        Some(w) if w.rainfall > 0.0 || w.humidity > 85.0 => TrackCondition::Damp,
        Some(_) => TrackCondition::Dry,
    }
}

/// Fold the latest weather sample into the session conditions
pub fn apply_weather(
    conditions: &SessionConditions,
    weather: &[WeatherRecord],
) -> Option<SessionConditions> {
    let latest = weather.last()?;
    Some(SessionConditions {
        air_temp: latest.air_temperature.round() as i32,
        track_temp: latest.track_temperature.round() as i32,
        track_condition: track_condition(Some(latest)),
        ..conditions.clone()
    })
}

/// Fold race-control messages into the session conditions
pub fn apply_race_control(
    conditions: &SessionConditions,
    messages: &[RaceControlRecord],
) -> Option<SessionConditions> {
    if messages.is_empty() {
        return None;
    }
    Some(SessionConditions {
        flag_status: flag_from_messages(messages),
        ..conditions.clone()
    })
}

/// Merge one positions poll into the standings
///
/// Every roster driver gets a row built from this poll's fields, falling
/// back field by field to the prior row. Drivers outside the roster are
/// dropped. The result is sorted and densely ranked 1..N. Returns `None` when
/// the roster is empty.
pub fn merge_positions(
    current: &[Standing],
    roster: &Roster,
    slices: &PositionSlices,
) -> Option<Vec<Standing>> {
    if roster.is_empty() {
        return None;
    }

    let positions = latest_by_driver(&slices.positions, |p| p.driver_number);
    let intervals = latest_by_driver(&slices.intervals, |i| i.driver_number);
    let stints = latest_by_driver(&slices.stints, |s| s.driver_number);
    let laps = latest_by_driver(&slices.laps, |l| l.driver_number);
    let pitstops = pitstop_counts(&slices.stints);
    let fastest = fastest_lap(&laps);
    let poll_has_laps = laps.values().any(|l| l.lap_duration.is_some());

    let dropped = positions.keys().filter(|n| !roster.contains(**n)).count();
    if dropped > 0 {
        tracing::debug!(dropped, "Position rows for drivers outside the roster ignored");
    }

    // (raw position, prior position, row)
    let mut rows: Vec<(u32, u32, Standing)> = roster
        .records()
        .iter()
        .map(|record| {
            let number = record.driver_number;
            let existing = current.iter().find(|s| s.driver.number == number);
            let lap = laps.get(&number).copied();

            let prior_position = existing.map(|s| s.position).unwrap_or(u32::MAX);
            let raw_position = positions
                .get(&number)
                .map(|p| p.position)
                .unwrap_or(prior_position);

            let sectors = SectorTimes {
                s1: lap
                    .and_then(|l| l.duration_sector_1)
                    .or_else(|| existing.and_then(|s| s.sectors.s1)),
                s2: lap
                    .and_then(|l| l.duration_sector_2)
                    .or_else(|| existing.and_then(|s| s.sectors.s2)),
                s3: lap
                    .and_then(|l| l.duration_sector_3)
                    .or_else(|| existing.and_then(|s| s.sectors.s3)),
            };

            let standing = Standing {
                position: raw_position,
                driver: driver_from_record(record),
                team: team_from_record(record),
                points: existing.map(|s| s.points).unwrap_or(0),
                wins: existing.map(|s| s.wins).unwrap_or(0),
                last_lap_time: lap
                    .and_then(|l| l.lap_duration)
                    .filter(|d| *d > 0.0)
                    .map(format_lap_time)
                    .or_else(|| existing.and_then(|s| s.last_lap_time.clone())),
                // Resolved after ranking
                gap: intervals
                    .get(&number)
                    .and_then(|i| i.gap_to_leader.as_ref())
                    .map(format_gap)
                    .or_else(|| existing.and_then(|s| s.gap.clone())),
                is_fastest_lap: if poll_has_laps {
                    fastest == Some(number)
                } else {
                    existing.map(|s| s.is_fastest_lap).unwrap_or(false)
                },
                telemetry: existing.and_then(|s| s.telemetry.clone()),
                sectors,
                tyre: stints
                    .get(&number)
                    .and_then(|s| s.compound.as_deref())
                    .and_then(TyreCompound::from_api)
                    .or_else(|| existing.and_then(|s| s.tyre)),
                pitstops: pitstops
                    .get(&number)
                    .copied()
                    .or_else(|| existing.map(|s| s.pitstops))
                    .unwrap_or(0),
            };

            (raw_position, prior_position, standing)
        })
        .collect();

    rows.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.driver.number.cmp(&b.2.driver.number))
    });

    let mut standings: Vec<Standing> = rows.into_iter().map(|(_, _, s)| s).collect();
    rank_densely(&mut standings);

    // A car that changed place without a fresh gap takes the previous gap of
    // whoever held its new position, so gaps stay ordered down the table
    let fresh_gaps: HashSet<u32> = intervals
        .iter()
        .filter_map(|(number, i)| i.gap_to_leader.as_ref().map(|_| *number))
        .collect();
    let prior_gap_at: HashMap<u32, &str> = current
        .iter()
        .filter_map(|s| {
            s.gap
                .as_deref()
                .filter(|g| *g != LEADER_GAP)
                .map(|g| (s.position, g))
        })
        .collect();
    for standing in standings.iter_mut() {
        if fresh_gaps.contains(&standing.driver.number) {
            continue;
        }
        let moved = current
            .iter()
            .find(|s| s.driver.number == standing.driver.number)
            .is_some_and(|s| s.position != standing.position);
        if let Some(gap) = prior_gap_at.get(&standing.position).filter(|_| moved) {
            standing.gap = Some(gap.to_string());
        }
    }

    // The new leader's previous gap, handed to a demoted leader with no fresh interval
    let leader_prior_gap = standings.first().and_then(|leader| {
        current
            .iter()
            .find(|s| s.driver.number == leader.driver.number)
            .and_then(|s| s.gap.clone())
            .filter(|g| g != LEADER_GAP)
    });

    for standing in standings.iter_mut() {
        if standing.position == 1 {
            standing.gap = Some(LEADER_GAP.to_string());
        } else if standing.is_leader() {
            standing.gap = leader_prior_gap.clone();
        }
    }

    Some(standings)
}

/// Renumber an already ordered table as 1..N
pub fn rank_densely(standings: &mut [Standing]) {
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.position = i as u32 + 1;
    }
}

/// Overwrite the telemetry snapshot of the given drivers
///
/// Returns `None` when no row matched.
pub fn apply_telemetry(
    current: &[Standing],
    updates: &HashMap<u32, Telemetry>,
) -> Option<Vec<Standing>> {
    if !current.iter().any(|s| updates.contains_key(&s.driver.number)) {
        return None;
    }
    Some(
        current
            .iter()
            .map(|s| match updates.get(&s.driver.number) {
                Some(telemetry) => Standing {
                    telemetry: Some(telemetry.clone()),
                    ..s.clone()
                },
                None => s.clone(),
            })
            .collect(),
    )
}

/// Latest gap to the leader in seconds per driver
pub fn gap_seconds(intervals: &[IntervalRecord]) -> HashMap<u32, f64> {
    intervals
        .iter()
        .filter_map(|i| {
            i.gap_to_leader
                .as_ref()
                .and_then(GapValue::seconds)
                .map(|g| (i.driver_number, g))
        })
        .collect()
}
