//! Live Feed
//!
//! Polls OpenF1 on a set of independent timers and folds each slice of race
//! state into the [`StateStore`].
//!
//! ## Lifecycle
//!
//! 1. **Bootstrap**: pick a session, fetch its roster, publish the driver list
//!    and mark the feed connected (which silences the simulator)
//! 2. **Poll**: five loops, each with its own period and start offset so
//!    requests are spread under the API's rate limit
//! 3. **Shutdown**: one cancellation token stops every loop; results that land
//!    after cancellation are discarded
//!
//! Every poll is fallible and every failure is logged and dropped. The next
//! tick is the retry.

mod cursor;
mod merge;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use cursor::{newest_sample, TelemetryCursors};
pub use merge::{
    apply_race_control, apply_telemetry, apply_weather, driver_from_record, fastest_lap,
    flag_from_messages, format_gap, format_lap_time, gap_seconds, latest_by_driver,
    merge_positions, parse_drs, pitstop_counts, rank_densely, team_from_record,
    telemetry_from_sample, track_condition, PositionSlices, Roster,
};
pub use session::{lookback_years, select_session, SelectedSession};

use chrono::Utc;
use futures_util::future::join_all;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::model::Telemetry;
use crate::openf1::{CarData, FetchError, RaceDataSource, SessionKey};
use crate::store::{DataSource, RaceState, StateStore, Writer};

/// Status string shown when bootstrap finds nothing to follow
pub const NO_SESSION: &str = "no session found";

/// Status string shown when the session has no drivers yet
pub const EMPTY_ROSTER: &str = "no drivers for session";

/// Polling schedule and limits
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Top-N telemetry loop period
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_ms: u64,

    #[serde(default = "default_leader_interval")]
    pub leader_telemetry_interval_ms: u64,

    #[serde(default = "default_positions_interval")]
    pub positions_interval_ms: u64,

    #[serde(default = "default_weather_interval")]
    pub weather_interval_ms: u64,

    #[serde(default = "default_race_control_interval")]
    pub race_control_interval_ms: u64,

    /// Start offsets, added before the first period
    #[serde(default = "default_positions_delay")]
    pub positions_delay_ms: u64,

    #[serde(default = "default_weather_delay")]
    pub weather_delay_ms: u64,

    #[serde(default = "default_race_control_delay")]
    pub race_control_delay_ms: u64,

    /// How many leading cars get telemetry
    #[serde(default = "default_top_n")]
    pub telemetry_top_n: usize,

    /// Car numbers polled for telemetry while the table is empty
    #[serde(default = "default_tracked_drivers")]
    pub tracked_drivers: Vec<u32>,

    /// Seasons searched for a recent race
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,

    #[serde(default = "default_bootstrap_retry")]
    pub bootstrap_retry_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_telemetry_interval() -> u64 {
    4000
}

fn default_leader_interval() -> u64 {
    2000
}

fn default_positions_interval() -> u64 {
    5000
}

fn default_weather_interval() -> u64 {
    30_000
}

fn default_race_control_interval() -> u64 {
    8000
}

fn default_positions_delay() -> u64 {
    1500
}

fn default_weather_delay() -> u64 {
    2500
}

fn default_race_control_delay() -> u64 {
    3500
}

fn default_top_n() -> usize {
    3
}

fn default_tracked_drivers() -> Vec<u32> {
    vec![1, 44, 16, 4, 81, 63, 55, 14, 18, 10]
}

fn default_lookback_years() -> u32 {
    3
}

fn default_bootstrap_retry() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            telemetry_interval_ms: default_telemetry_interval(),
            leader_telemetry_interval_ms: default_leader_interval(),
            positions_interval_ms: default_positions_interval(),
            weather_interval_ms: default_weather_interval(),
            race_control_interval_ms: default_race_control_interval(),
            positions_delay_ms: default_positions_delay(),
            weather_delay_ms: default_weather_delay(),
            race_control_delay_ms: default_race_control_delay(),
            telemetry_top_n: default_top_n(),
            tracked_drivers: default_tracked_drivers(),
            lookback_years: default_lookback_years(),
            bootstrap_retry_secs: default_bootstrap_retry(),
        }
    }
}

/// One polling loop: name, start offset, period
struct Schedule {
    name: &'static str,
    delay: Duration,
    period: Duration,
}

impl FeedConfig {
    fn schedule(&self, name: &'static str, delay_ms: u64, period_ms: u64) -> Schedule {
        Schedule {
            name,
            delay: Duration::from_millis(delay_ms),
            // A zero period would make tokio::time::interval panic
            period: Duration::from_millis(period_ms.max(1)),
        }
    }
}

/// Errors that end a bootstrap attempt
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{}", NO_SESSION)]
    NoSession,

    #[error("{}", EMPTY_ROSTER)]
    EmptyRoster,

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Feed stopped")]
    Cancelled,
}

/// Polls OpenF1 and merges results into the store
pub struct LiveFeed {
    source: Arc<dyn RaceDataSource>,
    store: StateStore,
    config: FeedConfig,
    cursors: TelemetryCursors,
    roster: RwLock<Arc<Roster>>,
    session: RwLock<Option<SessionKey>>,
    cancel: CancellationToken,
}

impl LiveFeed {
    /// Create a feed writing into `store`
    pub fn new(source: Arc<dyn RaceDataSource>, store: StateStore, config: FeedConfig) -> Self {
        Self {
            source,
            store,
            config,
            cursors: TelemetryCursors::new(),
            roster: RwLock::new(Arc::new(Roster::default())),
            session: RwLock::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn cursors(&self) -> &TelemetryCursors {
        &self.cursors
    }

    /// Session being followed, once bootstrapped
    pub fn session_key(&self) -> Option<SessionKey> {
        *self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn roster(&self) -> Arc<Roster> {
        Arc::clone(&self.roster.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Token cancelled by [`LiveFeed::shutdown`]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop all loops; late results are dropped
    pub fn shutdown(&self) {
        tracing::info!("Stopping live feed");
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Pick a session, load its roster and mark the feed connected
    pub async fn bootstrap(&self) -> Result<SelectedSession, FeedError> {
        let now = Utc::now();
        let years = lookback_years(now, self.config.lookback_years);

        let selected = match select_session(self.source.as_ref(), now, &years).await {
            Ok(Some(selected)) => selected,
            Ok(None) => {
                tracing::warn!("OpenF1 returned no session to follow");
                self.mark_disconnected(NO_SESSION.to_string());
                return Err(FeedError::NoSession);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed");
                self.mark_disconnected(e.to_string());
                return Err(FeedError::Fetch(e));
            }
        };

        let key = SessionKey::Key(selected.session.session_key);
        let records = match self.source.drivers(key).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Roster fetch failed");
                self.mark_disconnected(e.to_string());
                return Err(FeedError::Fetch(e));
            }
        };

        if self.is_stopped() {
            return Err(FeedError::Cancelled);
        }

        // Without a roster no position row can be merged
        let roster = Roster::new(records);
        if roster.is_empty() {
            tracing::warn!(
                session_key = selected.session.session_key,
                "OpenF1 returned no drivers for the session"
            );
            self.mark_disconnected(EMPTY_ROSTER.to_string());
            return Err(FeedError::EmptyRoster);
        }

        tracing::info!(
            session_key = selected.session.session_key,
            drivers = roster.len(),
            data_source = ?selected.data_source,
            "Live feed connected"
        );

        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(key);
        *self.roster.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(roster.clone());
        self.cursors.reset();

        let is_live = selected.data_source == DataSource::Live;
        let session = selected.session.clone();
        let data_source = selected.data_source;
        self.store.update(Writer::Feed, move |state| {
            let mut next = state.clone();
            next.drivers = roster.drivers();
            next.is_live = is_live;
            next.status.connected = true;
            next.status.session = Some(session);
            next.status.error = None;
            next.status.data_source = data_source;
            Some(next)
        });

        if let Err(e) = self.poll_positions().await {
            tracing::debug!(error = %e, "Initial positions poll failed");
        }
        if let Err(e) = self.poll_weather().await {
            tracing::debug!(error = %e, "Initial weather poll failed");
        }

        Ok(selected)
    }

    fn mark_disconnected(&self, error: String) {
        if self.is_stopped() {
            return;
        }
        self.store.update_status(|status| {
            status.connected = false;
            status.error = Some(error);
            if status.session.is_none() {
                status.data_source = DataSource::None;
            }
        });
    }

    /// Commit a reducer result and stamp the poll time
    ///
    /// Dropped once the feed is stopped.
    fn commit<F>(&self, reducer: F) -> bool
    where
        F: FnOnce(&RaceState) -> Option<RaceState>,
    {
        if self.is_stopped() {
            tracing::debug!("Discarding poll result after shutdown");
            return false;
        }
        self.store.update(Writer::Feed, |state| {
            let mut next = reducer(state).unwrap_or_else(|| state.clone());
            next.status.last_update = Some(Utc::now());
            Some(next)
        })
    }

    /// Positions, intervals, stints and laps in one merge
    pub async fn poll_positions(&self) -> Result<(), FetchError> {
        let Some(session) = self.session_key() else {
            return Ok(());
        };

        let (positions, intervals, stints, laps) = tokio::try_join!(
            self.source.positions(session),
            self.source.intervals(session),
            self.source.stints(session, None),
            self.source.laps(session, None),
        )?;

        tracing::debug!(
            positions = positions.len(),
            intervals = intervals.len(),
            stints = stints.len(),
            laps = laps.len(),
            "Positions poll"
        );

        let slices = PositionSlices {
            positions,
            intervals,
            stints,
            laps,
        };
        let roster = self.roster();

        self.commit(|state| {
            merge_positions(&state.standings, &roster, &slices).map(|standings| RaceState {
                standings,
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Car numbers the top-N telemetry loop polls
    pub fn telemetry_targets(&self) -> Vec<u32> {
        let state = self.store.snapshot();
        let top: Vec<u32> = state
            .standings
            .iter()
            .take(self.config.telemetry_top_n)
            .map(|s| s.driver.number)
            .collect();

        if top.is_empty() {
            self.config
                .tracked_drivers
                .iter()
                .take(self.config.telemetry_top_n)
                .copied()
                .collect()
        } else {
            top
        }
    }

    /// Fetch samples newer than the driver's cursor and advance it
    async fn fetch_samples(
        &self,
        session: SessionKey,
        driver_number: u32,
    ) -> Result<Option<CarData>, FetchError> {
        let since = self.cursors.get(driver_number);
        let samples = self.source.car_data(session, driver_number, since).await?;
        self.cursors.advance(driver_number, &samples);
        Ok(newest_sample(&samples).cloned())
    }

    /// Telemetry for the leading cars, with deltas from the latest intervals
    pub async fn poll_telemetry(&self) -> Result<(), FetchError> {
        let Some(session) = self.session_key() else {
            return Ok(());
        };
        let targets = self.telemetry_targets();

        let samples = join_all(
            targets
                .iter()
                .map(|&number| async move { (number, self.fetch_samples(session, number).await) }),
        );
        let (samples, intervals) = tokio::join!(samples, self.source.intervals(session));

        let mut latest: HashMap<u32, CarData> = HashMap::new();
        let mut first_error = None;
        for (number, result) in samples {
            match result {
                Ok(Some(sample)) => {
                    latest.insert(number, sample);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(driver_number = number, error = %e, "Telemetry fetch failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        // Nothing fetched and something failed: leave the status timestamp alone
        if let Some(e) = first_error {
            if latest.is_empty() {
                return Err(e);
            }
        }

        let gaps = match intervals {
            Ok(rows) => Some(gap_seconds(&rows)),
            Err(e) => {
                tracing::debug!(error = %e, "Interval fetch for telemetry deltas failed");
                None
            }
        };

        self.commit(|state| {
            let updates = resolve_telemetry(state, &latest, |number, prior| {
                gaps.as_ref()
                    .and_then(|g| g.get(&number).copied())
                    .or(prior)
                    .unwrap_or(0.0)
            });
            apply_telemetry(&state.standings, &updates).map(|standings| RaceState {
                standings,
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Telemetry for the current leader only, keeping its delta
    pub async fn poll_leader_telemetry(&self) -> Result<(), FetchError> {
        let Some(session) = self.session_key() else {
            return Ok(());
        };
        let Some(leader) = self.store.snapshot().leader().map(|s| s.driver.number) else {
            return Ok(());
        };

        let Some(sample) = self.fetch_samples(session, leader).await? else {
            return Ok(());
        };

        let mut latest = HashMap::new();
        latest.insert(leader, sample);
        self.commit(|state| {
            let updates = resolve_telemetry(state, &latest, |_, prior| prior.unwrap_or(0.0));
            apply_telemetry(&state.standings, &updates).map(|standings| RaceState {
                standings,
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Latest weather sample into the session conditions
    pub async fn poll_weather(&self) -> Result<(), FetchError> {
        let Some(session) = self.session_key() else {
            return Ok(());
        };
        let weather = self.source.weather(session).await?;

        self.commit(|state| {
            apply_weather(&state.conditions, &weather).map(|conditions| RaceState {
                conditions,
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Race-control messages into the flag status
    pub async fn poll_race_control(&self) -> Result<(), FetchError> {
        let Some(session) = self.session_key() else {
            return Ok(());
        };
        let messages = self.source.race_control(session).await?;

        self.commit(|state| {
            apply_race_control(&state.conditions, &messages).map(|conditions| {
                if conditions.flag_status != state.conditions.flag_status {
                    tracing::info!(flag = %conditions.flag_status, "Flag status changed");
                }
                RaceState {
                    conditions,
                    ..state.clone()
                }
            })
        });
        Ok(())
    }

    /// Bootstrap (retrying until it succeeds or the feed stops), then run the
    /// polling loops until shutdown
    pub fn start(feed: Arc<LiveFeed>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let cancel = feed.cancel_token();
            let retry = Duration::from_secs(feed.config.bootstrap_retry_secs.max(1));

            loop {
                if cancel.is_cancelled() {
                    return;
                }
                match feed.bootstrap().await {
                    Ok(_) => break,
                    Err(FeedError::Cancelled) => return,
                    Err(e) => {
                        tracing::warn!(error = %e, retry_secs = retry.as_secs(), "Bootstrap failed, retrying");
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            _ = tokio::time::sleep(retry) => {}
                        }
                    }
                }
            }

            let config = feed.config.clone();
            let handles = vec![
                spawn_loop(
                    &feed,
                    config.schedule("telemetry", 0, config.telemetry_interval_ms),
                    |feed| async move { feed.poll_telemetry().await },
                ),
                spawn_loop(
                    &feed,
                    config.schedule("leader_telemetry", 0, config.leader_telemetry_interval_ms),
                    |feed| async move { feed.poll_leader_telemetry().await },
                ),
                spawn_loop(
                    &feed,
                    config.schedule("positions", config.positions_delay_ms, config.positions_interval_ms),
                    |feed| async move { feed.poll_positions().await },
                ),
                spawn_loop(
                    &feed,
                    config.schedule("weather", config.weather_delay_ms, config.weather_interval_ms),
                    |feed| async move { feed.poll_weather().await },
                ),
                spawn_loop(
                    &feed,
                    config.schedule(
                        "race_control",
                        config.race_control_delay_ms,
                        config.race_control_interval_ms,
                    ),
                    |feed| async move { feed.poll_race_control().await },
                ),
            ];

            join_all(handles).await;
            tracing::info!("Live feed stopped");
        })
    }
}

/// Build telemetry snapshots, choosing each delta from the driver's prior one
fn resolve_telemetry<F>(
    state: &RaceState,
    samples: &HashMap<u32, CarData>,
    delta: F,
) -> HashMap<u32, Telemetry>
where
    F: Fn(u32, Option<f64>) -> f64,
{
    samples
        .iter()
        .map(|(&number, sample)| {
            let prior = state
                .standing(number)
                .and_then(|s| s.telemetry.as_ref())
                .map(|t| t.delta);
            (number, telemetry_from_sample(sample, delta(number, prior)))
        })
        .collect()
}

/// Run `poll` every `schedule.period` after `schedule.delay`, until cancelled
fn spawn_loop<F, Fut>(feed: &Arc<LiveFeed>, schedule: Schedule, poll: F) -> JoinHandle<()>
where
    F: Fn(Arc<LiveFeed>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), FetchError>> + Send + 'static,
{
    let feed = Arc::clone(feed);
    let cancel = feed.cancel_token();

    tokio::spawn(async move {
        let start = Instant::now() + schedule.delay + schedule.period;
        let mut ticker = tokio::time::interval_at(start, schedule.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            name = schedule.name,
            period_ms = schedule.period.as_millis() as u64,
            delay_ms = schedule.delay.as_millis() as u64,
            "Polling loop started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = poll(Arc::clone(&feed)).await {
                tracing::debug!(name = schedule.name, error = %e, "Poll failed");
            }
        }

        tracing::debug!(name = schedule.name, "Polling loop stopped");
    })
}
