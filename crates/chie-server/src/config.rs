//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Login session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Per-minute request limits.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "chie_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How long a login stays valid, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// How often expired sessions are swept, in seconds. `0` disables the sweep.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

/// Fixed-window rate limits, counted per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Limit for ordinary API requests.
    #[serde(default = "default_request_limit")]
    pub default_limit: u32,

    /// Limit for signup and login attempts.
    #[serde(default = "default_auth_limit")]
    pub auth_limit: u32,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "qa_app.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_ttl_secs() -> u64 {
    8 * 60 * 60
}

fn default_prune_interval_secs() -> u64 {
    300
}

fn default_request_limit() -> u32 {
    120
}

fn default_auth_limit() -> u32 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_limit: default_request_limit(),
            auth_limit: default_auth_limit(),
        }
    }
}

/// A loaded configuration and the problems that did not stop loading.
///
/// Loading runs before the log subscriber exists, so the caller logs
/// `warnings` once it is installed.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<String>,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CHIE_HOST` overrides `server.host`
/// - `CHIE_PORT` overrides `server.port`
/// - `CHIE_DB_PATH` overrides `database.path`
/// - `CHIE_LOG_LEVEL` overrides `logging.level`
/// - `CHIE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `CHIE_SESSION_TTL_SECS` overrides `session.ttl_secs`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    let mut warnings = Vec::new();
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warnings.push(format!("config file {p} not found, using defaults"));
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    warnings.extend(apply_overrides(&mut config, |key| std::env::var(key).ok()));
    Ok(LoadedConfig { config, warnings })
}

/// Applies `CHIE_*` overrides read through `lookup`.
///
/// Values that fail to parse are skipped; one warning is returned for each.
fn apply_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(host) = lookup("CHIE_HOST") {
        match host.parse() {
            Ok(parsed) => config.server.host = parsed,
            Err(_) => warnings.push(format!("ignoring invalid CHIE_HOST {host:?}")),
        }
    }
    if let Some(port) = lookup("CHIE_PORT") {
        match port.parse() {
            Ok(parsed) => config.server.port = parsed,
            Err(_) => warnings.push(format!("ignoring invalid CHIE_PORT {port:?}")),
        }
    }
    if let Some(db_path) = lookup("CHIE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("CHIE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("CHIE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(ttl) = lookup("CHIE_SESSION_TTL_SECS") {
        match ttl.parse() {
            Ok(parsed) => config.session.ttl_secs = parsed,
            Err(_) => {
                warnings.push(format!("ignoring invalid CHIE_SESSION_TTL_SECS {ttl:?}"))
            }
        }
    }
    warnings
}
