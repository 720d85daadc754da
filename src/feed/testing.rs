//! In-memory [`RaceDataSource`] for feed tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::openf1::{
    CarData, DriverRecord, Endpoint, FetchError, GapValue, IntervalRecord, LapRecord,
    PositionRecord, RaceControlRecord, RaceDataSource, Session, SessionKey, SessionQuery,
    StintRecord, WeatherRecord,
};

#[derive(Default)]
struct Canned {
    latest: Vec<Session>,
    by_year: HashMap<(i32, Option<String>), Vec<Session>>,
    drivers: Vec<DriverRecord>,
    car_data: Vec<CarData>,
    positions: Vec<PositionRecord>,
    intervals: Vec<IntervalRecord>,
    laps: Vec<LapRecord>,
    stints: Vec<StintRecord>,
    weather: Vec<WeatherRecord>,
    race_control: Vec<RaceControlRecord>,
    fail_all: bool,
    failing: HashSet<Endpoint>,
    calls: HashMap<Endpoint, usize>,
    car_data_requests: Vec<(u32, Option<DateTime<Utc>>)>,
}

/// Canned responses plus call counters
#[derive(Default)]
pub struct FakeSource {
    inner: Mutex<Canned>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Canned> {
        self.inner.lock().unwrap()
    }

    /// Count a call and fail it if configured to
    fn hit(&self, endpoint: Endpoint) -> Result<MutexGuard<'_, Canned>, FetchError> {
        let mut canned = self.lock();
        *canned.calls.entry(endpoint).or_default() += 1;
        if canned.fail_all || canned.failing.contains(&endpoint) {
            return Err(FetchError::Status {
                endpoint,
                status: 503,
            });
        }
        Ok(canned)
    }

    pub fn set_latest(&self, sessions: Vec<Session>) {
        self.lock().latest = sessions;
    }

    pub fn set_year(&self, year: i32, session_type: Option<&str>, sessions: Vec<Session>) {
        self.lock()
            .by_year
            .insert((year, session_type.map(str::to_string)), sessions);
    }

    pub fn set_drivers(&self, drivers: Vec<DriverRecord>) {
        self.lock().drivers = drivers;
    }

    pub fn push_car_data(&self, sample: CarData) {
        self.lock().car_data.push(sample);
    }

    pub fn set_positions(&self, positions: Vec<PositionRecord>) {
        self.lock().positions = positions;
    }

    pub fn set_intervals(&self, intervals: Vec<IntervalRecord>) {
        self.lock().intervals = intervals;
    }

    pub fn set_laps(&self, laps: Vec<LapRecord>) {
        self.lock().laps = laps;
    }

    pub fn set_stints(&self, stints: Vec<StintRecord>) {
        self.lock().stints = stints;
    }

    pub fn set_weather(&self, weather: Vec<WeatherRecord>) {
        self.lock().weather = weather;
    }

    pub fn set_race_control(&self, messages: Vec<RaceControlRecord>) {
        self.lock().race_control = messages;
    }

    pub fn fail_all(&self, fail: bool) {
        self.lock().fail_all = fail;
    }

    pub fn fail_endpoint(&self, endpoint: Endpoint) {
        self.lock().failing.insert(endpoint);
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    /// `(driver, since)` of every car-data request, in order
    pub fn car_data_requests(&self) -> Vec<(u32, Option<DateTime<Utc>>)> {
        self.lock().car_data_requests.clone()
    }

    pub fn session(
        session_key: u32,
        session_type: &str,
        year: i32,
        date_start: DateTime<Utc>,
        date_end: DateTime<Utc>,
    ) -> Session {
        Session {
            session_key,
            session_type: session_type.to_string(),
            session_name: session_type.to_string(),
            date_start,
            date_end,
            meeting_key: 1200,
            circuit_short_name: "Sakhir".to_string(),
            country_name: "Bahrain".to_string(),
            location: "Sakhir".to_string(),
            year,
        }
    }

    pub fn driver(driver_number: u32, acronym: &str, team: &str) -> DriverRecord {
        DriverRecord {
            driver_number,
            full_name: format!("Driver {acronym}"),
            name_acronym: acronym.to_string(),
            team_name: Some(team.to_string()),
            team_colour: Some("3671C6".to_string()),
            headshot_url: None,
            country_code: None,
        }
    }

    pub fn sample(driver_number: u32, at: DateTime<Utc>, speed: f64, drs: Option<u32>) -> CarData {
        CarData {
            date: at,
            driver_number,
            speed,
            rpm: 11_200,
            n_gear: 7,
            throttle: 99.0,
            brake: 0.0,
            drs,
        }
    }

    pub fn position(driver_number: u32, position: u32) -> PositionRecord {
        PositionRecord {
            date: Utc::now(),
            driver_number,
            position,
        }
    }

    pub fn interval(driver_number: u32, gap: f64) -> IntervalRecord {
        IntervalRecord {
            date: Utc::now(),
            driver_number,
            gap_to_leader: Some(GapValue::Seconds(gap)),
            interval: Some(GapValue::Seconds(gap)),
        }
    }

    pub fn weather(air: f64, track: f64, rainfall: f64) -> WeatherRecord {
        WeatherRecord {
            date: Utc::now(),
            air_temperature: air,
            track_temperature: track,
            humidity: 60.0,
            rainfall,
            wind_speed: Some(1.2),
        }
    }

    pub fn race_control(flag: Option<&str>, message: &str) -> RaceControlRecord {
        RaceControlRecord {
            date: Utc::now(),
            category: Some("Flag".to_string()),
            flag: flag.map(str::to_string),
            message: message.to_string(),
            scope: None,
            driver_number: None,
        }
    }
}

#[async_trait]
impl RaceDataSource for FakeSource {
    async fn sessions(&self, query: SessionQuery) -> Result<Vec<Session>, FetchError> {
        let canned = self.hit(Endpoint::Sessions)?;
        Ok(match query {
            SessionQuery::Latest => canned.latest.clone(),
            SessionQuery::Year { year, session_type } => canned
                .by_year
                .get(&(year, session_type))
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn drivers(&self, _session: SessionKey) -> Result<Vec<DriverRecord>, FetchError> {
        Ok(self.hit(Endpoint::Drivers)?.drivers.clone())
    }

    async fn car_data(
        &self,
        _session: SessionKey,
        driver_number: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CarData>, FetchError> {
        let mut canned = self.hit(Endpoint::CarData)?;
        canned.car_data_requests.push((driver_number, since));
        Ok(canned
            .car_data
            .iter()
            .filter(|s| s.driver_number == driver_number)
            .filter(|s| since.map_or(true, |since| s.date > since))
            .cloned()
            .collect())
    }

    async fn positions(&self, _session: SessionKey) -> Result<Vec<PositionRecord>, FetchError> {
        Ok(self.hit(Endpoint::Position)?.positions.clone())
    }

    async fn intervals(&self, _session: SessionKey) -> Result<Vec<IntervalRecord>, FetchError> {
        Ok(self.hit(Endpoint::Intervals)?.intervals.clone())
    }

    async fn laps(
        &self,
        _session: SessionKey,
        driver_number: Option<u32>,
    ) -> Result<Vec<LapRecord>, FetchError> {
        let canned = self.hit(Endpoint::Laps)?;
        Ok(canned
            .laps
            .iter()
            .filter(|l| driver_number.map_or(true, |n| l.driver_number == n))
            .cloned()
            .collect())
    }

    async fn weather(&self, _session: SessionKey) -> Result<Vec<WeatherRecord>, FetchError> {
        Ok(self.hit(Endpoint::Weather)?.weather.clone())
    }

    async fn stints(
        &self,
        _session: SessionKey,
        driver_number: Option<u32>,
    ) -> Result<Vec<StintRecord>, FetchError> {
        let canned = self.hit(Endpoint::Stints)?;
        Ok(canned
            .stints
            .iter()
            .filter(|s| driver_number.map_or(true, |n| s.driver_number == n))
            .cloned()
            .collect())
    }

    async fn race_control(
        &self,
        _session: SessionKey,
    ) -> Result<Vec<RaceControlRecord>, FetchError> {
        Ok(self.hit(Endpoint::RaceControl)?.race_control.clone())
    }
}
