//! Configuration System
//!
//! Loads settings from a TOML file and applies `F1PULSE_*` environment
//! variable overrides on top. Every section and field has a default, so an
//! empty file (or no file) is a valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::feed::FeedConfig;
use crate::openf1::ClientConfig;
use crate::simulator::SimulatorConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openf1: OpenF1Config,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OpenF1 client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OpenF1Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://api.openf1.org/v1".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("f1pulse/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for OpenF1Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl From<&OpenF1Config> for ClientConfig {
    fn from(config: &OpenF1Config) -> Self {
        ClientConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout_ms: config.request_timeout_ms,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Read API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed browser origins; empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("f1pulse").join("config.toml")),
            Some(PathBuf::from("/etc/f1pulse/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to load config");
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `F1PULSE_*` environment variables
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // OpenF1 overrides
        if let Some(url) = lookup("F1PULSE_OPENF1_URL") {
            self.openf1.base_url = url;
        }
        if let Some(timeout) = lookup("F1PULSE_OPENF1_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.openf1.request_timeout_ms = timeout;
        }

        // Feed and simulator switches
        if let Some(enabled) = lookup("F1PULSE_FEED_ENABLED").and_then(|v| parse_bool(&v)) {
            self.feed.enabled = enabled;
        }
        if let Some(years) = lookup("F1PULSE_LOOKBACK_YEARS").and_then(|v| v.parse().ok()) {
            self.feed.lookback_years = years;
        }
        if let Some(enabled) = lookup("F1PULSE_SIMULATOR_ENABLED").and_then(|v| parse_bool(&v)) {
            self.simulator.enabled = enabled;
        }
        if let Some(seed) = lookup("F1PULSE_SIMULATOR_SEED").and_then(|v| v.parse().ok()) {
            self.simulator.seed = Some(seed);
        }

        // API overrides
        if let Some(host) = lookup("F1PULSE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("F1PULSE_API_PORT").and_then(|v| v.parse().ok()) {
            self.api.port = port;
        }

        // Logging overrides
        if let Some(level) = lookup("F1PULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("F1PULSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# f1pulse Configuration
#
# Environment variables override these settings:
# - F1PULSE_OPENF1_URL
# - F1PULSE_OPENF1_TIMEOUT_MS
# - F1PULSE_FEED_ENABLED
# - F1PULSE_LOOKBACK_YEARS
# - F1PULSE_SIMULATOR_ENABLED
# - F1PULSE_SIMULATOR_SEED
# - F1PULSE_API_HOST
# - F1PULSE_API_PORT
# - F1PULSE_LOG_LEVEL
# - F1PULSE_LOG_FORMAT

[openf1]
# REST API base URL, including the version prefix
base_url = "https://api.openf1.org/v1"

# Per-request timeout (ms)
request_timeout_ms = 10000

[feed]
# Poll OpenF1 at all
enabled = true

# Loop periods (ms). OpenF1 allows roughly 3 requests/s and 30/min.
telemetry_interval_ms = 4000
leader_telemetry_interval_ms = 2000
positions_interval_ms = 5000
weather_interval_ms = 30000
race_control_interval_ms = 8000

# Start offsets (ms), added before the first period
positions_delay_ms = 1500
weather_delay_ms = 2500
race_control_delay_ms = 3500

# Leading cars polled for telemetry
telemetry_top_n = 3

# Car numbers polled while the table is empty
tracked_drivers = [1, 44, 16, 4, 81, 63, 55, 14, 18, 10]

# Seasons searched for a recent race
lookback_years = 3

# Delay before retrying a failed bootstrap (seconds)
bootstrap_retry_secs = 30

[simulator]
# Animate the seeded table while the feed is offline
enabled = true
telemetry_interval_ms = 1000
swap_interval_ms = 5000

# Fixed random seed
# seed = 42

[api]
# Serve the read API
enabled = true
host = "0.0.0.0"
port = 8082

# Allowed CORS origins (empty allows any)
cors_origins = []

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
