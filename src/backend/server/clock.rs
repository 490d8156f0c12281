//! Timestamp conversion for the SQLite columns
//!
//! Timestamps are stored as Unix milliseconds so that `ORDER BY` and range
//! comparisons work on plain integers.

use chrono::{DateTime, Utc};

/// Milliseconds since the Unix epoch
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Inverse of `to_millis`; out-of-range values clamp to the epoch
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}
