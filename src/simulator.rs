//! Fallback Simulator
//!
//! Keeps the seeded table moving while OpenF1 is unreachable: telemetry gets
//! a bounded random walk, and now and then two neighbouring cars trade places.
//! Every write goes through the store as [`Writer::Simulator`], so it is
//! dropped the moment the feed reports a connection. The simulator also stops
//! itself when it sees that flag.

use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::feed::rank_densely;
use crate::model::{Standing, Telemetry, LEADER_GAP};
use crate::store::{RaceState, StateStore, Writer};

/// Simulator settings
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval_ms: u64,

    #[serde(default = "default_swap_interval")]
    pub swap_interval_ms: u64,

    /// Fixed seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_telemetry_interval() -> u64 {
    1000
}

fn default_swap_interval() -> u64 {
    5000
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            telemetry_interval_ms: default_telemetry_interval(),
            swap_interval_ms: default_swap_interval(),
            seed: None,
        }
    }
}

// ============================================
// Random source
// ============================================

/// Small xorshift generator; not for anything but jitter
#[derive(Debug, Clone)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        // xorshift is stuck at zero
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    /// Seed from the wall clock
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::seeded(nanos)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [-amplitude, amplitude)
    pub fn jitter(&mut self, amplitude: f64) -> f64 {
        (self.next_f64() * 2.0 - 1.0) * amplitude
    }

    /// Uniform in 0..n; n must be non-zero
    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

// ============================================
// Perturbations
// ============================================

/// One random-walk step of a telemetry snapshot
pub fn jitter_telemetry(telemetry: &Telemetry, is_leader: bool, rng: &mut SimRng) -> Telemetry {
    let gear_step = if rng.chance(0.3) {
        if rng.chance(0.5) {
            1
        } else {
            -1
        }
    } else {
        0
    };
    let drs = if rng.chance(0.05) {
        !telemetry.drs
    } else {
        telemetry.drs
    };
    let delta = if is_leader {
        0.0
    } else {
        (telemetry.delta + rng.jitter(0.05)).max(0.0)
    };

    Telemetry {
        speed: (telemetry.speed + rng.jitter(8.0)).clamp(60.0, 345.0),
        rpm: (telemetry.rpm as f64 + rng.jitter(250.0)).clamp(8000.0, 12_500.0) as u32,
        gear: (telemetry.gear as i32 + gear_step).clamp(1, 8) as u8,
        throttle: (telemetry.throttle + rng.jitter(10.0)).clamp(0.0, 100.0),
        brake: (telemetry.brake + rng.jitter(10.0)).clamp(0.0, 100.0),
        drs,
        delta,
    }
}

/// Jitter every row that already has a telemetry snapshot
///
/// Returns `None` when no row has telemetry.
pub fn perturb_standings(standings: &[Standing], rng: &mut SimRng) -> Option<Vec<Standing>> {
    if standings.iter().all(|s| s.telemetry.is_none()) {
        return None;
    }
    Some(
        standings
            .iter()
            .map(|s| match &s.telemetry {
                Some(t) => Standing {
                    telemetry: Some(jitter_telemetry(t, s.is_leader(), rng)),
                    ..s.clone()
                },
                None => s.clone(),
            })
            .collect(),
    )
}

/// Move the car at `index + 1` ahead of the car at `index`
///
/// A new leader shows `LEADER` and hands its old gap to the car it passed;
/// elsewhere the two cars trade gap strings. Returns `None` when there is no
/// row after `index`.
pub fn swap_adjacent(standings: &[Standing], index: usize) -> Option<Vec<Standing>> {
    if index + 1 >= standings.len() {
        return None;
    }

    let mut next = standings.to_vec();
    next.swap(index, index + 1);

    let ahead_gap = standings[index].gap.clone();
    let behind_gap = standings[index + 1].gap.clone();

    if index == 0 {
        next[0].gap = Some(LEADER_GAP.to_string());
        next[1].gap = behind_gap;
    } else {
        next[index].gap = ahead_gap;
        next[index + 1].gap = behind_gap;
    }

    rank_densely(&mut next);
    Some(next)
}

// ============================================
// Runner
// ============================================

/// Perturbs the store on two timers until the feed connects
pub struct FallbackSimulator {
    store: StateStore,
    config: SimulatorConfig,
    rng: Mutex<SimRng>,
    cancel: CancellationToken,
}

impl FallbackSimulator {
    pub fn new(store: StateStore, config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SimRng::seeded(seed),
            None => SimRng::from_clock(),
        };
        Self {
            store,
            config,
            rng: Mutex::new(rng),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut SimRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    /// One telemetry step; returns whether the store accepted it
    pub fn tick_telemetry(&self) -> bool {
        self.with_rng(|rng| {
            self.store.update(Writer::Simulator, |state| {
                perturb_standings(&state.standings, rng).map(|standings| RaceState {
                    standings,
                    ..state.clone()
                })
            })
        })
    }

    /// One random overtake; returns whether the store accepted it
    pub fn tick_swap(&self) -> bool {
        self.with_rng(|rng| {
            self.store.update(Writer::Simulator, |state| {
                if state.standings.len() < 2 {
                    return None;
                }
                let index = rng.below(state.standings.len() - 1);
                swap_adjacent(&state.standings, index).map(|standings| RaceState {
                    standings,
                    ..state.clone()
                })
            })
        })
    }

    /// Run both timers until cancelled or the feed connects
    pub fn start(sim: Arc<FallbackSimulator>) -> JoinHandle<()> {
        tokio::spawn(async move {
            // Subscribe before the check so a connect in between is still seen
            let mut updates = sim.store.subscribe();
            if updates.borrow_and_update().status.connected {
                tracing::debug!("Feed already connected, simulator not started");
                return;
            }

            let telemetry_period = Duration::from_millis(sim.config.telemetry_interval_ms.max(1));
            let swap_period = Duration::from_millis(sim.config.swap_interval_ms.max(1));
            let now = tokio::time::Instant::now();

            let mut telemetry = tokio::time::interval_at(now + telemetry_period, telemetry_period);
            telemetry.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut swaps = tokio::time::interval_at(now + swap_period, swap_period);
            swaps.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                telemetry_ms = telemetry_period.as_millis() as u64,
                swap_ms = swap_period.as_millis() as u64,
                "Fallback simulator running"
            );

            loop {
                tokio::select! {
                    _ = sim.cancel.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() || updates.borrow().status.connected {
                            tracing::info!("Feed connected, stopping simulator");
                            break;
                        }
                    }
                    _ = telemetry.tick() => {
                        sim.tick_telemetry();
                    }
                    _ = swaps.tick() => {
                        sim.tick_swap();
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock;

    fn telemetry() -> Telemetry {
        Telemetry {
            speed: 300.0,
            rpm: 11_000,
            gear: 7,
            throttle: 90.0,
            brake: 5.0,
            drs: false,
            delta: 0.4,
        }
    }

    #[test]
    fn test_rng_is_reproducible() {
        let mut a = SimRng::seeded(42);
        let mut b = SimRng::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut zero = SimRng::seeded(0);
        assert_ne!(zero.next_u64(), 0);
    }

    #[test]
    fn test_rng_ranges() {
        let mut rng = SimRng::seeded(7);
        for _ in 0..1000 {
            let f = rng.next_f64();
            assert!((0.0..1.0).contains(&f));
            let j = rng.jitter(8.0);
            assert!((-8.0..8.0).contains(&j));
            assert!(rng.below(9) < 9);
        }
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut rng = SimRng::seeded(1234);
        let mut t = telemetry();
        for _ in 0..5000 {
            t = jitter_telemetry(&t, false, &mut rng);
            assert!((60.0..=345.0).contains(&t.speed));
            assert!((8000..=12_500).contains(&t.rpm));
            assert!((1..=8).contains(&t.gear));
            assert!((0.0..=100.0).contains(&t.throttle));
            assert!((0.0..=100.0).contains(&t.brake));
            assert!(t.delta >= 0.0);
        }
    }

    #[test]
    fn test_leader_delta_stays_zero() {
        let mut rng = SimRng::seeded(9);
        let t = jitter_telemetry(&telemetry(), true, &mut rng);
        assert_eq!(t.delta, 0.0);
    }

    #[test]
    fn test_perturb_only_rows_with_telemetry() {
        let mut rng = SimRng::seeded(3);
        let standings = mock::standings();
        let next = perturb_standings(&standings, &mut rng).unwrap();
        assert!(next[..3].iter().all(|s| s.telemetry.is_some()));
        assert!(next[3..].iter().all(|s| s.telemetry.is_none()));
        assert_eq!(next[5], standings[5]);

        let bare: Vec<Standing> = standings[3..].to_vec();
        assert!(perturb_standings(&bare, &mut rng).is_none());
    }

    #[test]
    fn test_swap_for_the_lead() {
        let standings = mock::standings();
        let next = swap_adjacent(&standings, 0).unwrap();

        assert_eq!(next[0].driver.id, "NOR");
        assert_eq!(next[0].position, 1);
        assert_eq!(next[0].gap.as_deref(), Some(LEADER_GAP));
        assert_eq!(next[1].driver.id, "VER");
        assert_eq!(next[1].position, 2);
        assert_eq!(next[1].gap.as_deref(), Some("+0.153"));
    }

    #[test]
    fn test_swap_midfield_trades_gaps() {
        let standings = mock::standings();
        let next = swap_adjacent(&standings, 3).unwrap();

        assert_eq!(next[3].driver.id, standings[4].driver.id);
        assert_eq!(next[3].gap, standings[3].gap);
        assert_eq!(next[4].driver.id, standings[3].driver.id);
        assert_eq!(next[4].gap, standings[4].gap);

        let positions: Vec<u32> = next.iter().map(|s| s.position).collect();
        assert_eq!(positions, (1..=10).collect::<Vec<u32>>());
        assert!(swap_adjacent(&standings, 9).is_none());
    }

    #[test]
    fn test_ticks_rejected_while_connected() {
        let store = StateStore::seeded();
        let sim = FallbackSimulator::new(
            store.clone(),
            SimulatorConfig {
                seed: Some(5),
                ..Default::default()
            },
        );

        assert!(sim.tick_telemetry());
        assert!(sim.tick_swap());

        store.update_status(|s| s.connected = true);
        let before = store.snapshot();
        assert!(!sim.tick_telemetry());
        assert!(!sim.tick_swap());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_feed_connects() {
        let store = StateStore::seeded();
        let sim = Arc::new(FallbackSimulator::new(
            store.clone(),
            SimulatorConfig {
                seed: Some(11),
                ..Default::default()
            },
        ));
        let handle = FallbackSimulator::start(Arc::clone(&sim));

        let seeded = store.snapshot();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_ne!(
            seeded.standings[0].telemetry,
            store.snapshot().standings[0].telemetry
        );

        store.update_status(|s| s.connected = true);
        handle.await.unwrap();

        let frozen = store.snapshot();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(Arc::ptr_eq(&frozen, &store.snapshot()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_connected_before_start() {
        let store = StateStore::seeded();
        store.update_status(|s| s.connected = true);
        let sim = Arc::new(FallbackSimulator::new(store.clone(), SimulatorConfig::default()));

        let handle = FallbackSimulator::start(Arc::clone(&sim));
        let finished = tokio::time::timeout(Duration::from_secs(10), handle).await;
        assert!(finished.is_ok(), "simulator kept running after connect");
        assert!(!sim.cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timers() {
        let store = StateStore::seeded();
        let sim = Arc::new(FallbackSimulator::new(store.clone(), SimulatorConfig::default()));
        let handle = FallbackSimulator::start(Arc::clone(&sim));

        sim.shutdown();
        handle.await.unwrap();
        let before = store.snapshot();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }
}
