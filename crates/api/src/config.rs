//! Application configuration loaded from environment variables.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use saga::{ActivitySettings, RetryPolicy};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to load .env file: {0}")]
    EnvFileLoad(#[source] dotenv::Error),
}

/// Server and saga configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `SAGA_TIME_UNIT_MS` length of one policy time unit (default: `1000`)
/// - `ACTIVITY_DELAY_UNITS` simulated activity latency in units (default: `3`)
/// - `INVENTORY_SHORTAGE_PROBABILITY` (default: `0.1`)
/// - `PAYMENT_DECLINE_PROBABILITY` (default: `0.5`)
/// - `NOTIFICATION_FAILURE_PROBABILITY` (default: `0.0`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Unit in which retry intervals, timeouts and activity delays are expressed.
    pub time_unit: Duration,
    pub activities: ActivitySettings,
}

impl Config {
    /// Loads configuration from the process environment, after merging in a
    /// `.env` file from the working directory if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::EnvFileLoad(e)),
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let time_unit_ms: u64 = parse_var(&lookup, "SAGA_TIME_UNIT_MS", 1000)?;
        if time_unit_ms == 0 {
            return Err(ConfigError::InvalidValue {
                var: "SAGA_TIME_UNIT_MS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let time_unit = Duration::from_millis(time_unit_ms);
        let delay_units: u32 = parse_var(&lookup, "ACTIVITY_DELAY_UNITS", 3)?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 3000)?,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            time_unit,
            activities: ActivitySettings {
                processing_delay: time_unit * delay_units,
                inventory_shortage_probability: probability_var(
                    &lookup,
                    "INVENTORY_SHORTAGE_PROBABILITY",
                    0.1,
                )?,
                payment_decline_probability: probability_var(&lookup, "PAYMENT_DECLINE_PROBABILITY", 0.5)?,
                notification_failure_probability: probability_var(
                    &lookup,
                    "NOTIFICATION_FAILURE_PROBABILITY",
                    0.0,
                )?,
            },
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_time_unit(self.time_unit)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            time_unit: Duration::from_secs(1),
            activities: ActivitySettings::default(),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn probability_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: f32,
) -> Result<f32, ConfigError> {
    let probability: f32 = parse_var(lookup, var, default)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(ConfigError::InvalidValue {
            var,
            value: probability.to_string(),
            reason: "must be between 0 and 1".to_string(),
        });
    }
    Ok(probability)
}
