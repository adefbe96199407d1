//! Environment-driven defaults for sensor definitions and tick runners.

use std::str::FromStr;
use std::time::Duration;

use sensor_types::{DEFAULT_MODE_NAME, DEFAULT_SENSOR_DAEMON_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!(
                "Invalid log format '{other}'. Expected 'pretty' or 'json'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// Mode for definitions that do not set one
    pub default_mode: String,
    /// Polling interval for definitions that do not set one
    pub minimum_interval_seconds: u32,
    /// Upper bound for async ticks; `None` waits for the evaluation to finish
    pub tick_timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            default_mode: DEFAULT_MODE_NAME.to_string(),
            minimum_interval_seconds: DEFAULT_SENSOR_DAEMON_INTERVAL,
            tick_timeout: None,
            log_format: LogFormat::default(),
        }
    }
}

impl SensorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let minimum_interval_seconds = parse_or(
            &lookup,
            "SENSOR_MINIMUM_INTERVAL_SECS",
            DEFAULT_SENSOR_DAEMON_INTERVAL,
        )?;
        if minimum_interval_seconds == 0 {
            return Err(anyhow::anyhow!(
                "SENSOR_MINIMUM_INTERVAL_SECS must be a positive integer"
            ));
        }

        let tick_timeout = match lookup("SENSOR_TICK_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                anyhow::anyhow!("Failed to parse env var SENSOR_TICK_TIMEOUT_SECS={raw}: {e}")
            })?)),
            None => None,
        };

        Ok(Self {
            default_mode: lookup("SENSOR_DEFAULT_MODE")
                .filter(|mode| !mode.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODE_NAME.to_string()),
            minimum_interval_seconds,
            tick_timeout,
            log_format: parse_or(&lookup, "SENSOR_LOG_FORMAT", LogFormat::default())?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}
