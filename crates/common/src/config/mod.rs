//! Configuration management for R-kive services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Hosted database configuration
    pub database: DatabaseConfig,

    /// Access token verification
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Related-paper ranking parameters
    #[serde(default)]
    pub related: RelatedConfig,

    /// Realtime event bus
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret the hosted backend signs access tokens with
    pub jwt_secret: Option<String>,

    /// Expected `aud` claim; `None` skips the audience check
    #[serde(default = "default_audience")]
    pub audience: Option<String>,

    /// Lifetime of tokens minted by [`crate::auth::SessionVerifier::issue`]
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error); RUST_LOG wins when set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name attached to log lines
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    #[serde(default = "default_burst")]
    pub burst: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelatedConfig {
    /// Threshold used when the caller does not pass one
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Candidates fetched per ranking pass
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: u64,

    /// Related papers kept after sorting
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Upper bound on citation-tree traversal depth
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Broadcast buffer; slower subscribers skip the oldest events
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// SSE keep-alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 100 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_audience() -> Option<String> { Some("authenticated".to_string()) }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "rkive".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }
fn default_threshold() -> f64 { 0.6 }
fn default_candidate_limit() -> u64 { 50 }
fn default_max_results() -> usize { 10 }
fn default_max_tree_depth() -> usize { 3 }
fn default_channel_capacity() -> usize { 256 }
fn default_keep_alive() -> u64 { 15 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            audience: default_audience(),
            jwt_expiration_secs: default_jwt_expiration(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            candidate_limit: default_candidate_limit(),
            max_results: default_max_results(),
            max_tree_depth: default_max_tree_depth(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. APP__DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file, still honouring APP__ overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/rkive".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            related: RelatedConfig::default(),
            events: EventsConfig::default(),
        }
    }
}
