//! Agent configuration loaded from environment variables.
//!
//! Thresholds are compile-time constants in `statprobe_core::thresholds`
//! and cannot be changed here. Only the operational knobs below are read,
//! once, at startup.

use std::time::Duration;

use statprobe_core::FieldParsing;

/// Endpoint polled when `STATS_URL` is unset.
pub const DEFAULT_STATS_URL: &str = "http://srv.msk01.gigacorp.local/_stats";

/// Seconds between checks when `CHECK_INTERVAL_SECS` is unset.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Log output format for the stderr subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Runtime configuration for the probe.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// URL of the `/_stats` endpoint.
    pub stats_url: String,
    /// Delay between the end of one check and the start of the next.
    pub interval: Duration,
    /// Per-request timeout. `None` waits for as long as the server takes.
    pub fetch_timeout: Option<Duration>,
    pub field_parsing: FieldParsing,
    pub log_format: LogFormat,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            stats_url: DEFAULT_STATS_URL.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            fetch_timeout: None,
            field_parsing: FieldParsing::Lenient,
            log_format: LogFormat::Text,
        }
    }
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                                  |
    /// |------------------------|------------------------------------------|
    /// | `STATS_URL`            | `http://srv.msk01.gigacorp.local/_stats` |
    /// | `CHECK_INTERVAL_SECS`  | `10`                                     |
    /// | `FETCH_TIMEOUT_SECS`   | unset (no timeout)                       |
    /// | `STRICT_FIELD_PARSING` | `false`                                  |
    /// | `LOG_FORMAT`           | `text`                                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("STATS_URL") {
            if url.trim().is_empty() {
                return Err(invalid("STATS_URL", url, "must not be empty"));
            }
            config.stats_url = url;
        }

        if let Some(raw) = lookup("CHECK_INTERVAL_SECS") {
            config.interval = Duration::from_secs(positive_secs("CHECK_INTERVAL_SECS", raw)?);
        }

        if let Some(raw) = lookup("FETCH_TIMEOUT_SECS") {
            config.fetch_timeout =
                Some(Duration::from_secs(positive_secs("FETCH_TIMEOUT_SECS", raw)?));
        }

        if let Some(raw) = lookup("STRICT_FIELD_PARSING") {
            config.field_parsing = match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => FieldParsing::Strict,
                "false" | "0" | "no" => FieldParsing::Lenient,
                _ => return Err(invalid("STRICT_FIELD_PARSING", raw, "expected true or false")),
            };
        }

        if let Some(raw) = lookup("LOG_FORMAT") {
            config.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(invalid("LOG_FORMAT", raw, "expected text or json")),
            };
        }

        Ok(config)
    }
}

fn positive_secs(var: &'static str, raw: String) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid(var, raw, "must be greater than zero")),
        Ok(secs) => Ok(secs),
        Err(_) => Err(invalid(var, raw, "must be a whole number of seconds")),
    }
}

fn invalid(var: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { var, value, reason }
}
