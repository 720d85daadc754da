//! Session Selection
//!
//! Picks the session the feed follows: the latest session while it is still
//! running, else the newest race of the last few seasons, else the newest
//! session of any kind in those seasons, else whatever `latest` was.

use chrono::{DateTime, Datelike, Utc};

use crate::openf1::{FetchError, RaceDataSource, Session, SessionQuery};
use crate::store::DataSource;

/// A chosen session and how to label its data
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSession {
    pub session: Session,
    pub data_source: DataSource,
}

impl SelectedSession {
    fn at(session: Session, now: DateTime<Utc>) -> Self {
        let data_source = if session.is_live_at(now) {
            DataSource::Live
        } else {
            DataSource::Recent
        };
        Self {
            session,
            data_source,
        }
    }
}

/// Seasons to search, newest first
pub fn lookback_years(now: DateTime<Utc>, count: u32) -> Vec<i32> {
    let year = now.year();
    (0..count.max(1) as i32).map(|back| year - back).collect()
}

/// Choose the session to follow
///
/// Fails only on fetch errors; `Ok(None)` means the API knows no session.
pub async fn select_session(
    source: &dyn RaceDataSource,
    now: DateTime<Utc>,
    years: &[i32],
) -> Result<Option<SelectedSession>, FetchError> {
    let latest = source.sessions(SessionQuery::Latest).await?.pop();

    if let Some(session) = &latest {
        if session.is_live_at(now) {
            tracing::info!(session_key = session.session_key, "Following live session");
            return Ok(Some(SelectedSession::at(session.clone(), now)));
        }
    }

    for &year in years {
        if let Some(race) = source.sessions(SessionQuery::races(year)).await?.pop() {
            tracing::info!(session_key = race.session_key, year, "Following most recent race");
            return Ok(Some(SelectedSession::at(race, now)));
        }
    }

    for &year in years {
        if let Some(session) = source.sessions(SessionQuery::any(year)).await?.pop() {
            tracing::info!(
                session_key = session.session_key,
                year,
                session_type = %session.session_type,
                "Following most recent session"
            );
            return Ok(Some(SelectedSession::at(session, now)));
        }
    }

    Ok(latest.map(|session| SelectedSession::at(session, now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::FakeSource;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2025-07-06T15:30:00Z".parse().unwrap()
    }

    #[test]
    fn test_lookback_years() {
        assert_eq!(lookback_years(now(), 3), vec![2025, 2024, 2023]);
        assert_eq!(lookback_years(now(), 0), vec![2025]);
    }

    #[tokio::test]
    async fn test_prefers_live_latest() {
        let source = FakeSource::new();
        let live = FakeSource::session(100, "Race", 2025, now() - Duration::hours(1), now() + Duration::hours(1));
        source.set_latest(vec![live.clone()]);
        source.set_year(2025, Some("Race"), vec![FakeSource::session(
            90,
            "Race",
            2025,
            now() - Duration::days(7),
            now() - Duration::days(7) + Duration::hours(2),
        )]);

        let selected = select_session(&source, now(), &[2025, 2024]).await.unwrap().unwrap();
        assert_eq!(selected.session.session_key, 100);
        assert_eq!(selected.data_source, DataSource::Live);
    }

    #[tokio::test]
    async fn test_falls_back_to_recent_race() {
        let source = FakeSource::new();
        let finished = now() - Duration::days(1);
        source.set_latest(vec![FakeSource::session(
            101,
            "Practice",
            2025,
            finished - Duration::hours(1),
            finished,
        )]);
        source.set_year(2024, Some("Race"), vec![
            FakeSource::session(80, "Race", 2024, finished - Duration::days(300), finished - Duration::days(300)),
            FakeSource::session(85, "Race", 2024, finished - Duration::days(200), finished - Duration::days(200)),
        ]);

        let selected = select_session(&source, now(), &[2025, 2024]).await.unwrap().unwrap();
        assert_eq!(selected.session.session_key, 85);
        assert_eq!(selected.data_source, DataSource::Recent);
    }

    #[tokio::test]
    async fn test_falls_back_to_any_session_then_latest() {
        let source = FakeSource::new();
        let past = now() - Duration::days(30);
        source.set_year(2024, None, vec![FakeSource::session(70, "Qualifying", 2024, past, past)]);

        let selected = select_session(&source, now(), &[2025, 2024]).await.unwrap().unwrap();
        assert_eq!(selected.session.session_key, 70);

        let source = FakeSource::new();
        source.set_latest(vec![FakeSource::session(60, "Practice", 2023, past, past)]);
        let selected = select_session(&source, now(), &[2025]).await.unwrap().unwrap();
        assert_eq!(selected.session.session_key, 60);
        assert_eq!(selected.data_source, DataSource::Recent);
    }

    #[tokio::test]
    async fn test_no_session() {
        let source = FakeSource::new();
        assert!(select_session(&source, now(), &[2025]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let source = FakeSource::new();
        source.fail_all(true);
        assert!(select_session(&source, now(), &[2025]).await.is_err());
    }
}
