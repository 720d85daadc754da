//! f1pulse
//!
//! Runs the live feed, the fallback simulator and the read API against one
//! shared state store.
//!
//! Run with: cargo run -- --config ./config.toml
//!
//! Logging follows `RUST_LOG` when set, else the configured level.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use f1pulse::api::{self, AppState};
use f1pulse::config::{generate_default_config, Config, LoggingConfig};
use f1pulse::feed::LiveFeed;
use f1pulse::openf1::{ClientConfig, OpenF1Client, RaceDataSource};
use f1pulse::simulator::FallbackSimulator;
use f1pulse::store::StateStore;

#[derive(Parser, Debug)]
#[command(name = "f1pulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live F1 race-state feed backed by OpenF1")]
struct Cli {
    /// Config file (default: searched in the usual locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not poll OpenF1
    #[arg(long)]
    no_feed: bool,

    /// Do not animate the seeded table
    #[arg(long)]
    no_simulator: bool,

    /// Do not serve the read API
    #[arg(long)]
    no_api: bool,

    /// Print a commented default config and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("f1pulse={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);
    tracing::info!("Starting f1pulse v{}", env!("CARGO_PKG_VERSION"));

    let store = StateStore::seeded();
    let shutdown = CancellationToken::new();
    let mut tasks = Vec::new();

    let simulator = if config.simulator.enabled && !cli.no_simulator {
        let simulator = Arc::new(FallbackSimulator::new(store.clone(), config.simulator.clone()));
        tasks.push(FallbackSimulator::start(Arc::clone(&simulator)));
        Some(simulator)
    } else {
        tracing::info!("Simulator disabled");
        None
    };

    let feed = if config.feed.enabled && !cli.no_feed {
        let client = OpenF1Client::new(ClientConfig::from(&config.openf1))
            .context("building OpenF1 client")?;
        tracing::info!(base_url = %client.config().base_url, "Polling OpenF1");

        let source: Arc<dyn RaceDataSource> = Arc::new(client);
        let feed = Arc::new(LiveFeed::new(source, store.clone(), config.feed.clone()));
        tasks.push(LiveFeed::start(Arc::clone(&feed)));
        Some(feed)
    } else {
        tracing::info!("Live feed disabled");
        None
    };

    let server = if config.api.enabled && !cli.no_api {
        let state = AppState::new(store.clone(), config.api.clone());
        let api_config = config.api.clone();
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            api::serve(state, &api_config, token).await
        }))
    } else {
        tracing::info!("Read API disabled");
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    tracing::info!("Shutdown signal received, stopping");

    shutdown.cancel();
    if let Some(feed) = &feed {
        feed.shutdown();
    }
    if let Some(simulator) = &simulator {
        simulator.shutdown();
    }

    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }
    if let Some(server) = server {
        server.await.context("API task panicked")??;
    }

    tracing::info!("f1pulse shutdown complete");
    Ok(())
}
