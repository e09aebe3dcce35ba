//! Timestamp rendering
//!
//! Converts an event's creation instant into an ISO 8601 string in a
//! configured timezone with a configured sub-second precision.

use super::error::{LoggerError, Result};
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sub-second precision of rendered timestamps
///
/// # Examples
///
/// ```
/// use log_pipeline::core::TimeSpec;
///
/// let spec: TimeSpec = "microseconds".parse().unwrap();
/// assert_eq!(spec, TimeSpec::Microseconds);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSpec {
    /// Seconds when the fractional part is zero, microseconds otherwise
    Auto,
    /// `2025-01-08T10+00:00`
    Hours,
    /// `2025-01-08T10:30+00:00`
    Minutes,
    /// `2025-01-08T10:30:45+00:00`
    Seconds,
    /// `2025-01-08T10:30:45.123+00:00`
    #[default]
    Milliseconds,
    /// `2025-01-08T10:30:45.123456+00:00`
    Microseconds,
}

impl TimeSpec {
    /// strftime pattern for this precision
    fn pattern(&self) -> &'static str {
        match self {
            TimeSpec::Hours => "%Y-%m-%dT%H%:z",
            TimeSpec::Minutes => "%Y-%m-%dT%H:%M%:z",
            TimeSpec::Seconds => "%Y-%m-%dT%H:%M:%S%:z",
            TimeSpec::Milliseconds => "%Y-%m-%dT%H:%M:%S%.3f%:z",
            TimeSpec::Microseconds => "%Y-%m-%dT%H:%M:%S%.6f%:z",
            TimeSpec::Auto => "%Y-%m-%dT%H:%M:%S%.6f%:z",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSpec::Auto => "auto",
            TimeSpec::Hours => "hours",
            TimeSpec::Minutes => "minutes",
            TimeSpec::Seconds => "seconds",
            TimeSpec::Milliseconds => "milliseconds",
            TimeSpec::Microseconds => "microseconds",
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSpec {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(TimeSpec::Auto),
            "hours" => Ok(TimeSpec::Hours),
            "minutes" => Ok(TimeSpec::Minutes),
            "seconds" => Ok(TimeSpec::Seconds),
            "milliseconds" => Ok(TimeSpec::Milliseconds),
            "microseconds" => Ok(TimeSpec::Microseconds),
            other => Err(LoggerError::config(
                "TimeSpec",
                format!("unknown precision '{}'", other),
            )),
        }
    }
}

/// Resolved timezone plus precision; immutable after construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampRenderer {
    timezone: Tz,
    timespec: TimeSpec,
}

impl TimestampRenderer {
    /// Resolve an IANA timezone identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::UnknownTimezone`] if the identifier is not a known zone.
    pub fn new(timezone: &str, timespec: TimeSpec) -> Result<Self> {
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|_| LoggerError::unknown_timezone(timezone))?;
        Ok(Self { timezone, timespec })
    }

    /// UTC renderer; cannot fail
    #[must_use]
    pub fn utc(timespec: TimeSpec) -> Self {
        Self {
            timezone: Tz::UTC,
            timespec,
        }
    }

    pub fn timezone(&self) -> &str {
        self.timezone.name()
    }

    pub fn timespec(&self) -> TimeSpec {
        self.timespec
    }

    /// Render `instant` in the configured zone
    #[must_use]
    pub fn render(&self, instant: &DateTime<Utc>) -> String {
        render(instant, self.timezone, self.timespec)
    }
}

impl Default for TimestampRenderer {
    fn default() -> Self {
        Self::utc(TimeSpec::default())
    }
}

/// Render `instant` as ISO 8601 in `timezone` with `timespec` precision.
///
/// Fractional digits are truncated, never rounded.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Tz;
/// use log_pipeline::core::{timestamp, TimeSpec};
///
/// let instant = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(
///     timestamp::render(&instant, Tz::UTC, TimeSpec::Auto),
///     "2025-01-08T10:30:45+00:00"
/// );
/// ```
#[must_use]
pub fn render(instant: &DateTime<Utc>, timezone: Tz, timespec: TimeSpec) -> String {
    let local = instant.with_timezone(&timezone);
    let pattern = match timespec {
        // leap-second nanos run past 1e9
        TimeSpec::Auto if (local.nanosecond() % 1_000_000_000) / 1_000 == 0 => {
            TimeSpec::Seconds.pattern()
        }
        other => other.pattern(),
    };
    local.format(pattern).to_string()
}

/// Rendering configuration: timezone identifier and sub-second precision
///
/// Resolved once with [`RenderConfig::resolve`]; a missing timezone means UTC.
///
/// # Examples
///
/// ```
/// use log_pipeline::core::{RenderConfig, TimeSpec};
///
/// let renderer = RenderConfig::new()
///     .with_timezone("Europe/Berlin")
///     .with_timespec(TimeSpec::Seconds)
///     .resolve()
///     .unwrap();
/// assert_eq!(renderer.timezone(), "Europe/Berlin");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub timespec: TimeSpec,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl RenderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    #[must_use]
    pub fn with_timespec(mut self, timespec: TimeSpec) -> Self {
        self.timespec = timespec;
        self
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::UnknownTimezone`] for an unresolvable identifier.
    pub fn resolve(&self) -> Result<TimestampRenderer> {
        match self.timezone.as_deref() {
            Some(timezone) => TimestampRenderer::new(timezone, self.timespec),
            None => Ok(TimestampRenderer::utc(self.timespec)),
        }
    }
}
