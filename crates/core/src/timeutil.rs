//! Timestamp normalization.
//!
//! Every timestamp inside the library is a `DateTime<Utc>`: provider data,
//! user input and stored snapshots are all coerced here, at ingestion, so
//! that no comparison site ever has to reason about naive-vs-aware or mixed
//! timezones. Naive timestamps are interpreted as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Convert a unix timestamp (seconds) to UTC. `None` if out of range.
pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Interpret a naive timestamp as UTC.
pub fn from_naive(ts: NaiveDateTime) -> DateTime<Utc> {
    ts.and_utc()
}

/// Coerce an offset-carrying timestamp to UTC.
pub fn from_fixed(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

/// Midnight UTC for a calendar date.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    from_naive(date.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
}
