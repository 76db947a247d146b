//! Relay server configuration.
//!
//! Centralizes environment variable parsing with defaults for local
//! development. Command-line arguments of the binary override these values.

use std::time::Duration;

use roomcast_shared::logger::LogFormat;

use crate::usecase::{DEFAULT_SESSION_TTL, DEFAULT_SWEEP_INTERVAL};

/// Development-only signing secret.
pub const DEV_JWT_SECRET: &str = "roomcast_local_development_jwt_secret_32+";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file, or `:memory:`.
    pub database_path: String,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "roomcast.db".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `ROOMCAST_HOST` | `127.0.0.1` |
    /// | `ROOMCAST_PORT` | `8080` |
    /// | `ROOMCAST_DATABASE_PATH` | `roomcast.db` |
    /// | `ROOMCAST_JWT_SECRET` | dev-only placeholder |
    /// | `ROOMCAST_SESSION_TTL_SECS` | `1800` |
    /// | `ROOMCAST_SWEEP_INTERVAL_SECS` | `30` |
    /// | `ROOMCAST_LOG_LEVEL` | `info` |
    /// | `ROOMCAST_LOG_FORMAT` | `pretty` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            env(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            host: env("ROOMCAST_HOST").unwrap_or(defaults.host),
            port: env("ROOMCAST_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database_path: env("ROOMCAST_DATABASE_PATH").unwrap_or(defaults.database_path),
            jwt_secret: env("ROOMCAST_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            session_ttl: secs("ROOMCAST_SESSION_TTL_SECS", defaults.session_ttl),
            sweep_interval: secs("ROOMCAST_SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            log_level: env("ROOMCAST_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: env("ROOMCAST_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
        }
    }

    /// Returns true when using the development-only JWT secret.
    pub fn is_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
