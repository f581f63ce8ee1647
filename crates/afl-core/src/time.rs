//! Time utilities for afl
//!
//! Formatting and parsing of the timestamp keys used by the remote snapshot
//! document.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Format of snapshot document keys: two-digit year, day, month, then
/// time of day with microseconds, in local time.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%y/%d/%m %H:%M:%S%.6f";

/// Render an instant as a snapshot document key
pub fn format_snapshot_timestamp<Tz: TimeZone>(instant: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string()
}

/// Snapshot key for the current local instant
pub fn snapshot_timestamp_now() -> String {
    format_snapshot_timestamp(&Local::now())
}

/// Parse a snapshot document key. Keys written by other tools that do not
/// follow the format yield `None`.
pub fn parse_snapshot_timestamp(key: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(key, SNAPSHOT_TIMESTAMP_FORMAT).ok()
}
