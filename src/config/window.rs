//! Sliding-window sampling configuration.

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

/// Unit of a window interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    #[default]
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
}

impl IntervalUnit {
    /// Milliseconds in one unit.
    #[must_use]
    pub const fn millis(self) -> u64 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }
}

/// Unvalidated serde form of [`WindowConfig`]; every value passes through
/// [`WindowConfig::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfigRaw {
    /// Number of buckets.
    pub sample_count: usize,
    /// Interval length in `unit`s.
    pub interval: u64,
    /// Interval unit, seconds by default.
    #[serde(default)]
    pub unit: IntervalUnit,
}

/// Validated window layout: `sample_count` buckets over `interval_ms`.
///
/// `window_length_ms` is `interval_ms / sample_count` with the remainder
/// dropped. Bucket validity is judged against `interval_ms`, so the drift is
/// bounded by one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowConfigRaw", into = "WindowConfigRaw")]
pub struct WindowConfig {
    sample_count: usize,
    interval_ms: u64,
    window_length_ms: u64,
}

impl WindowConfig {
    /// Default sample count.
    pub const DEFAULT_SAMPLE_COUNT: usize = 10;
    /// Default interval, in seconds.
    pub const DEFAULT_INTERVAL_SECS: u64 = 80;

    /// Validate and build a window config.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidArgument` if `sample_count` or `interval` is zero,
    ///   or if there are more samples than milliseconds in the interval.
    /// - `ConfigError::Overflow` if the interval exceeds `u32::MAX` milliseconds.
    pub fn new(sample_count: usize, interval: u64, unit: IntervalUnit) -> Result<Self, ConfigError> {
        if sample_count == 0 {
            return Err(ConfigError::InvalidArgument(
                "sample_count must be greater than 0".into(),
            ));
        }
        if interval == 0 {
            return Err(ConfigError::InvalidArgument(
                "interval must be greater than 0".into(),
            ));
        }
        let interval_ms = interval
            .checked_mul(unit.millis())
            .filter(|ms| *ms <= u64::from(u32::MAX))
            .ok_or_else(|| {
                ConfigError::Overflow(format!(
                    "interval {interval} {unit:?} exceeds {} ms",
                    u32::MAX
                ))
            })?;
        let samples = u64::try_from(sample_count).unwrap_or(u64::MAX);
        if samples > interval_ms {
            return Err(ConfigError::InvalidArgument(format!(
                "sample_count {sample_count} exceeds interval of {interval_ms} ms"
            )));
        }
        Ok(Self {
            sample_count,
            interval_ms,
            window_length_ms: interval_ms / samples,
        })
    }

    /// Number of buckets.
    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Total interval covered by all buckets, in milliseconds.
    #[must_use]
    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Length of one bucket, in milliseconds.
    #[must_use]
    pub const fn window_length_ms(&self) -> u64 {
        self.window_length_ms
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        let interval_ms = Self::DEFAULT_INTERVAL_SECS * IntervalUnit::Seconds.millis();
        Self {
            sample_count: Self::DEFAULT_SAMPLE_COUNT,
            interval_ms,
            window_length_ms: interval_ms / Self::DEFAULT_SAMPLE_COUNT as u64,
        }
    }
}

impl TryFrom<WindowConfigRaw> for WindowConfig {
    type Error = ConfigError;

    fn try_from(raw: WindowConfigRaw) -> Result<Self, Self::Error> {
        Self::new(raw.sample_count, raw.interval, raw.unit)
    }
}

impl From<WindowConfig> for WindowConfigRaw {
    fn from(cfg: WindowConfig) -> Self {
        Self {
            sample_count: cfg.sample_count,
            interval: cfg.interval_ms,
            unit: IntervalUnit::Milliseconds,
        }
    }
}
