//! Telemetry Cursors
//!
//! Last-seen sample timestamp per driver, so each telemetry poll asks only
//! for newer samples. A cursor moves only when a fetch returned data and
//! never moves backwards.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::openf1::CarData;

/// Per-driver `date>` cursors shared by the telemetry loops
#[derive(Debug, Default)]
pub struct TelemetryCursors {
    inner: Mutex<HashMap<u32, DateTime<Utc>>>,
}

impl TelemetryCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor to send with the next request for a driver
    pub fn get(&self, driver_number: u32) -> Option<DateTime<Utc>> {
        self.lock().get(&driver_number).copied()
    }

    /// Advance a driver's cursor past the newest sample in `samples`
    ///
    /// Returns the cursor after the call.
    pub fn advance(&self, driver_number: u32, samples: &[CarData]) -> Option<DateTime<Utc>> {
        let newest = samples.iter().map(|s| s.date).max();
        let mut cursors = self.lock();

        if let Some(newest) = newest {
            let cursor = cursors.entry(driver_number).or_insert(newest);
            if newest > *cursor {
                *cursor = newest;
            }
        }

        cursors.get(&driver_number).copied()
    }

    /// Forget every cursor (new session)
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, DateTime<Utc>>> {
        // A poisoned map only holds timestamps; keep using it
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Newest sample of a batch
pub fn newest_sample(samples: &[CarData]) -> Option<&CarData> {
    samples.iter().max_by_key(|s| s.date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(driver_number: u32, at: DateTime<Utc>, speed: f64) -> CarData {
        CarData {
            date: at,
            driver_number,
            speed,
            rpm: 11_000,
            n_gear: 7,
            throttle: 100.0,
            brake: 0.0,
            drs: None,
        }
    }

    #[test]
    fn test_cursor_starts_empty() {
        let cursors = TelemetryCursors::new();
        assert_eq!(cursors.get(1), None);
        assert_eq!(cursors.advance(1, &[]), None);
    }

    #[test]
    fn test_cursor_monotonic() {
        let cursors = TelemetryCursors::new();
        let t0: DateTime<Utc> = "2024-03-02T15:00:00Z".parse().unwrap();

        let mut last = None;
        // Batches arrive out of order and sometimes empty
        let batches: Vec<Vec<CarData>> = vec![
            vec![sample(1, t0, 100.0), sample(1, t0 + Duration::milliseconds(250), 110.0)],
            vec![],
            vec![sample(1, t0 + Duration::milliseconds(100), 105.0)],
            vec![sample(1, t0 + Duration::seconds(2), 200.0)],
            vec![],
        ];

        for batch in &batches {
            let cursor = cursors.advance(1, batch);
            assert!(cursor >= last, "cursor moved backwards");
            last = cursor;
        }

        assert_eq!(cursors.get(1), Some(t0 + Duration::seconds(2)));
    }

    #[test]
    fn test_cursors_are_per_driver() {
        let cursors = TelemetryCursors::new();
        let t0: DateTime<Utc> = "2024-03-02T15:00:00Z".parse().unwrap();

        cursors.advance(1, &[sample(1, t0, 100.0)]);
        cursors.advance(44, &[sample(44, t0 + Duration::seconds(5), 100.0)]);

        assert_eq!(cursors.get(1), Some(t0));
        assert_eq!(cursors.get(44), Some(t0 + Duration::seconds(5)));

        cursors.reset();
        assert_eq!(cursors.get(44), None);
    }

    #[test]
    fn test_newest_sample() {
        let t0: DateTime<Utc> = "2024-03-02T15:00:00Z".parse().unwrap();
        let samples = vec![
            sample(1, t0 + Duration::seconds(1), 150.0),
            sample(1, t0, 100.0),
        ];
        assert_eq!(newest_sample(&samples).unwrap().speed, 150.0);
        assert!(newest_sample(&[]).is_none());
    }
}
