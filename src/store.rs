//! Race State Store
//!
//! Holds the one shared [`RaceState`] table. Writers never mutate it in
//! place: they hand the store a reducer that builds the next snapshot from the
//! current one, and the store swaps the whole `Arc` under the watch channel's
//! lock. Readers clone the `Arc` or subscribe for change notifications.
//!
//! The feed and the fallback simulator both write here. A simulated write is
//! rejected inside that same lock when the feed reports a live connection, so
//! the two sources can never interleave.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::model::{mock, Driver, Race, SessionConditions, Standing};
use crate::openf1::Session;

/// Where the displayed data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Session in progress
    Live,
    /// Replay of a finished session
    Recent,
    /// Seed data only
    None,
}

/// Connection status of the live feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStatus {
    pub connected: bool,
    pub session: Option<Session>,
    /// Last successful poll
    pub last_update: Option<DateTime<Utc>>,
    /// User-visible error of the last bootstrap attempt
    pub error: Option<String>,
    pub data_source: DataSource,
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self {
            connected: false,
            session: None,
            last_update: None,
            error: None,
            data_source: DataSource::None,
        }
    }
}

/// Complete dashboard state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceState {
    pub drivers: Vec<Driver>,
    pub races: Vec<Race>,
    /// Sorted by position
    pub standings: Vec<Standing>,
    pub conditions: SessionConditions,
    pub is_live: bool,
    pub status: FeedStatus,
}

impl RaceState {
    /// State seeded from the built-in field
    pub fn seeded() -> Self {
        Self {
            drivers: mock::drivers(),
            races: mock::races(),
            standings: mock::standings(),
            conditions: SessionConditions::default(),
            is_live: false,
            status: FeedStatus::default(),
        }
    }

    /// Standing of a car number
    pub fn standing(&self, number: u32) -> Option<&Standing> {
        self.standings.iter().find(|s| s.driver.number == number)
    }

    /// Row at position 1
    pub fn leader(&self) -> Option<&Standing> {
        self.standings.first()
    }
}

/// Identifies who is writing to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writer {
    Feed,
    Simulator,
}

/// Shared handle to the state table
#[derive(Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<Arc<RaceState>>>,
}

impl StateStore {
    /// Create a store holding `initial`
    pub fn new(initial: RaceState) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Create a store seeded from the built-in field
    pub fn seeded() -> Self {
        Self::new(RaceState::seeded())
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<RaceState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver notified on every committed change
    pub fn subscribe(&self) -> watch::Receiver<Arc<RaceState>> {
        self.tx.subscribe()
    }

    /// Whether the feed currently reports a live connection
    pub fn is_connected(&self) -> bool {
        self.tx.borrow().status.connected
    }

    /// Apply a reducer and swap in its result
    ///
    /// The reducer returns `None` to leave the state untouched. Simulator
    /// writes are dropped while the feed is connected. Returns whether a new
    /// snapshot was committed.
    pub fn update<F>(&self, writer: Writer, reducer: F) -> bool
    where
        F: FnOnce(&RaceState) -> Option<RaceState>,
    {
        self.tx.send_if_modified(|current| {
            if writer == Writer::Simulator && current.status.connected {
                return false;
            }
            match reducer(current) {
                Some(next) => {
                    *current = Arc::new(next);
                    true
                }
                None => false,
            }
        })
    }

    /// Replace the feed status
    pub fn update_status<F>(&self, f: F)
    where
        F: FnOnce(&mut FeedStatus),
    {
        self.update(Writer::Feed, |state| {
            let mut next = state.clone();
            f(&mut next.status);
            Some(next)
        });
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::seeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_snapshot() {
        let store = StateStore::seeded();
        let state = store.snapshot();
        assert_eq!(state.standings.len(), 10);
        assert_eq!(state.leader().unwrap().driver.id, "VER");
        assert_eq!(state.standing(44).unwrap().driver.id, "HAM");
        assert!(!store.is_connected());
        assert_eq!(state.status.data_source, DataSource::None);
    }

    #[test]
    fn test_update_replaces_whole_snapshot() {
        let store = StateStore::seeded();
        let before = store.snapshot();

        let committed = store.update(Writer::Feed, |state| {
            let mut next = state.clone();
            next.is_live = true;
            Some(next)
        });

        assert!(committed);
        let after = store.snapshot();
        assert!(after.is_live);
        // Old readers keep their snapshot
        assert!(!before.is_live);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_none_reducer_keeps_state() {
        let store = StateStore::seeded();
        let before = store.snapshot();
        assert!(!store.update(Writer::Feed, |_| None));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_simulator_rejected_while_connected() {
        let store = StateStore::seeded();
        store.update_status(|s| s.connected = true);

        let committed = store.update(Writer::Simulator, |state| {
            let mut next = state.clone();
            next.standings.clear();
            Some(next)
        });

        assert!(!committed);
        assert_eq!(store.snapshot().standings.len(), 10);

        // Feed writes still go through
        assert!(store.update(Writer::Feed, |state| Some(state.clone())));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = StateStore::seeded();
        let mut rx = store.subscribe();

        store.update_status(|s| s.error = Some("no session found".to_string()));

        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().status.error.as_deref(),
            Some("no session found")
        );
    }
}
