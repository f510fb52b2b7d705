use std::str::FromStr;
use std::time::Duration;

use crate::errors::StreamError;

const PAUSE_ENV: &str = "CALLBACK_STREAM_PAUSE_SECS";
const TIMEOUT_ENV: &str = "CALLBACK_STREAM_TIMEOUT_SECS";
const WAIT_ENV: &str = "CALLBACK_STREAM_WAIT";

/// How the consumer waits while the buffer is empty and the run is still going.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategy {
    /// Sleep for `pause` and re-check.
    #[default]
    Poll,
    /// Park until a hook signals new data, re-checking at least every `pause`.
    Notify,
}

impl FromStr for WaitStrategy {
    type Err = StreamError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "poll" | "sleep" => Ok(Self::Poll),
            "notify" | "wake" => Ok(Self::Notify),
            other => Err(StreamError::config(format!(
                "unknown wait strategy `{other}` (expected `poll` or `notify`)"
            ))),
        }
    }
}

/// Consumer-side timing for one stream session.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Interval between checks of an empty buffer.
    #[serde(rename = "pause_secs", with = "duration_secs")]
    pub pause: Duration,
    /// Maximum idle time without a new event or completion.
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    /// How an empty buffer is waited on.
    pub wait: WaitStrategy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(200),
            timeout: Duration::from_secs(5),
            wait: WaitStrategy::Poll,
        }
    }
}

impl StreamConfig {
    /// Sets the polling interval.
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Sets the idle timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how the consumer waits on an empty buffer.
    pub fn wait_strategy(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Builds a config from defaults overlaid with `CALLBACK_STREAM_*` variables.
    ///
    /// - `CALLBACK_STREAM_PAUSE_SECS`: polling interval in (fractional) seconds.
    /// - `CALLBACK_STREAM_TIMEOUT_SECS`: idle timeout in (fractional) seconds.
    /// - `CALLBACK_STREAM_WAIT`: `poll` or `notify`.
    pub fn from_env() -> Result<Self, StreamError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StreamError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(PAUSE_ENV) {
            config.pause = parse_secs(PAUSE_ENV, &raw)?;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.timeout = parse_secs(TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(WAIT_ENV) {
            config.wait = raw.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the consumer loop cannot honor.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.pause.is_zero() {
            return Err(StreamError::config("pause must be greater than 0"));
        }
        if self.timeout.is_zero() {
            return Err(StreamError::config("timeout must be greater than 0"));
        }
        if self.pause > self.timeout {
            return Err(StreamError::config(format!(
                "pause ({:?}) must not exceed timeout ({:?})",
                self.pause, self.timeout
            )));
        }
        Ok(())
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, StreamError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| StreamError::config(format!("{key}: invalid duration `{raw}`")))
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
