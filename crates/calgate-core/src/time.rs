//! Time handling for calendar queries.
//!
//! This module provides:
//! - [`TimeWindow`] for free/busy query ranges
//! - [`format_timestamp`] / [`parse_timestamp`] for the ISO-8601 strings
//!   exchanged with the calendar API

use chrono::{DateTime, Duration, FixedOffset, ParseResult, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Length of the default free/busy window.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// A time range used for querying calendars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a time window from a start time and duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    /// The default query window: `now` until seven days later.
    pub fn upcoming_week(now: DateTime<Utc>) -> Self {
        Self::from_duration(now, Duration::days(DEFAULT_WINDOW_DAYS))
    }

    /// Start of the window as an API timestamp.
    pub fn start_timestamp(&self) -> String {
        format_timestamp(self.start)
    }

    /// End of the window as an API timestamp.
    pub fn end_timestamp(&self) -> String {
        format_timestamp(self.end)
    }
}

/// Formats a UTC instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp, keeping its offset.
pub fn parse_timestamp(value: &str) -> ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
}
