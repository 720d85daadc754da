//! # f1pulse
//!
//! Live race-state feed for a Formula 1 dashboard. Polls the public OpenF1 REST
//! API on several independent timers, merges each partial slice (positions,
//! gaps, laps, stints, weather, race control, car telemetry) into one
//! standings table, and serves that table over HTTP and WebSocket.
//!
//! ## Modules
//!
//! - [`openf1`]: REST client and response types
//! - [`feed`]: session bootstrap, polling loops and merge reducers
//! - [`store`]: the shared state table
//! - [`simulator`]: keeps seeded data moving while the API is offline
//! - [`model`]: dashboard data model and seed data
//! - [`api`], [`websocket`]: read API
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use f1pulse::feed::{FeedConfig, LiveFeed};
//! use f1pulse::openf1::{ClientConfig, OpenF1Client, RaceDataSource};
//! use f1pulse::store::StateStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StateStore::seeded();
//!     let source: Arc<dyn RaceDataSource> = Arc::new(OpenF1Client::new(ClientConfig::default())?);
//!
//!     let feed = Arc::new(LiveFeed::new(source, store.clone(), FeedConfig::default()));
//!     let handle = LiveFeed::start(Arc::clone(&feed));
//!
//!     let mut updates = store.subscribe();
//!     updates.changed().await?;
//!     println!("{} cars on track", updates.borrow().standings.len());
//!
//!     feed.shutdown();
//!     handle.await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod feed;
pub mod model;
pub mod openf1;
pub mod simulator;
pub mod store;
pub mod websocket;

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, OpenF1Config};

pub use feed::{FeedConfig, FeedError, LiveFeed, SelectedSession};

pub use model::{
    Driver, FlagStatus, Race, SessionConditions, Standing, Team, Telemetry, TrackCondition,
    TyreCompound,
};

pub use openf1::{ClientConfig, FetchError, OpenF1Client, RaceDataSource, Session, SessionKey};

pub use simulator::{FallbackSimulator, SimRng, SimulatorConfig};

pub use store::{DataSource, FeedStatus, RaceState, StateStore, Writer};

pub use websocket::{websocket_handler, ClientMessage, ServerMessage};
