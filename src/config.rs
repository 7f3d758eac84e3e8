use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::colab::ViewOptions;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Cloud service identifiers
    #[serde(default = "default_service_name")]
    pub cloud_service_name: String,

    /// JWT secret key
    pub cloud_auth_jwt_secret: Option<String>,

    /// Number of activity items kept per document
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,

    /// Silence after which an active session is shown as idle
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,

    /// Silence after which a session is dropped
    #[serde(default = "default_session_ttl_ms")]
    pub session_ttl_ms: u64,

    /// Cadence of the stale session sweep
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// How long clients should display a notification
    #[serde(default = "default_notification_duration_ms")]
    pub notification_duration_ms: u64,

    /// Buffer of the per-document broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy; tracing is not up yet,
        // so the caller reports the outcome
        envy::from_env::<Config>().map_err(ConfigError::EnvError)
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Tracing filter applied when RUST_LOG is not set
    pub fn log_filter(&self) -> String {
        format!(
            "colabri_presence={0},tower_http={0},axum::rejection=trace,{0}",
            self.log_level
        )
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    /// Options every document view is created with
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            feed_capacity: self.feed_capacity,
            heartbeat_timeout: millis(self.heartbeat_timeout_ms),
            session_ttl: millis(self.session_ttl_ms),
            notification_duration_ms: self.notification_duration_ms,
        }
    }

    /// Allowed CORS origins, empty when not configured
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn millis(ms: u64) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            log_level: default_log_level(),
            cloud_service_name: default_service_name(),
            cloud_auth_jwt_secret: None,
            feed_capacity: default_feed_capacity(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            session_ttl_ms: default_session_ttl_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            notification_duration_ms: default_notification_duration_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "colabri-presence".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_feed_capacity() -> usize {
    crate::colab::activity::DEFAULT_FEED_CAPACITY
}

fn default_heartbeat_timeout_ms() -> u64 {
    30_000
}

fn default_session_ttl_ms() -> u64 {
    5 * 60 * 1000
}

fn default_sweep_interval_ms() -> u64 {
    10_000
}

fn default_notification_duration_ms() -> u64 {
    crate::colab::notification::DEFAULT_NOTIFICATION_DURATION_MS
}

fn default_channel_capacity() -> usize {
    256
}
