//! Worker configuration loaded from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected `text` or `json`".to_string()),
        }
    }
}

/// An environment variable holds a value that cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Worker configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string; unset means in-memory stores
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `PROJECTOR_INTERVAL_SECS`: delay between projection cycles (default: `5`)
/// - `METRICS_ADDR`: Prometheus listener (default: `"0.0.0.0:9000"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub projector_interval: Duration,
    pub metrics_addr: SocketAddr,
    pub log_format: LogFormat,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// unset or empty variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let projector_interval = match get("PROJECTOR_INTERVAL_SECS") {
            Some(value) => {
                let secs: u64 = parse("PROJECTOR_INTERVAL_SECS", &value)?;
                if secs == 0 {
                    return Err(ConfigError {
                        var: "PROJECTOR_INTERVAL_SECS",
                        value,
                        reason: "must be at least 1".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.projector_interval,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .map(|v| parse("DATABASE_MAX_CONNECTIONS", &v))
                .transpose()?
                .unwrap_or(defaults.database_max_connections),
            projector_interval,
            metrics_addr: get("METRICS_ADDR")
                .map(|v| parse("METRICS_ADDR", &v))
                .transpose()?
                .unwrap_or(defaults.metrics_addr),
            log_format: get("LOG_FORMAT")
                .map(|v| parse("LOG_FORMAT", &v))
                .transpose()?
                .unwrap_or(defaults.log_format),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            projector_interval: Duration::from_secs(5),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            log_format: LogFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database_url, None);
        assert_eq!(config.projector_interval, Duration::from_secs(5));
        assert_eq!(config.metrics_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_reads_every_variable() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("PROJECTOR_INTERVAL_SECS", "30"),
            ("METRICS_ADDR", "127.0.0.1:9100"),
            ("LOG_FORMAT", "JSON"),
            ("RUST_LOG", "projections=debug"),
        ])
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/orders"));
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.projector_interval, Duration::from_secs(30));
        assert_eq!(config.metrics_addr.port(), 9100);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "projections=debug");
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = load(&[("DATABASE_URL", ""), ("PROJECTOR_INTERVAL_SECS", " ")]).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.projector_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_interval() {
        let err = load(&[("PROJECTOR_INTERVAL_SECS", "soon")]).unwrap_err();
        assert_eq!(err.var, "PROJECTOR_INTERVAL_SECS");
        assert_eq!(err.value, "soon");

        let err = load(&[("PROJECTOR_INTERVAL_SECS", "0")]).unwrap_err();
        assert_eq!(err.reason, "must be at least 1");
    }

    #[test]
    fn test_invalid_log_format() {
        let err = load(&[("LOG_FORMAT", "xml")]).unwrap_err();
        assert_eq!(err.var, "LOG_FORMAT");
    }

    #[test]
    fn test_invalid_metrics_addr() {
        let err = load(&[("METRICS_ADDR", "not-an-address")]).unwrap_err();
        assert_eq!(err.var, "METRICS_ADDR");
    }
}
