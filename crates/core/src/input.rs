//! Presentation-boundary parsing and validation.
//!
//! Raw form input is validated here, before it reaches the core's
//! algorithms. Unparseable timestamps are rejected with a warning and the
//! operation proceeds with "now" as the documented default; bad amounts and
//! names abort the operation with `InvalidInput`.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;

use crate::errors::CoreError;
use crate::timeutil;

/// The single accepted timestamp format (HTML `datetime-local` shape).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse a timestamp in the fixed format, interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map(timeutil::from_naive)
        .map_err(|_| {
            CoreError::InvalidInput(format!(
                "Unparseable timestamp '{raw}' (expected {TIMESTAMP_FORMAT})"
            ))
        })
}

/// Parse an optional timestamp, falling back to now. An unparseable value is
/// logged and replaced with now rather than failing the operation.
pub fn parse_timestamp_or_now(raw: Option<&str>) -> DateTime<Utc> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Utc::now(),
        Some(s) => parse_timestamp(s).unwrap_or_else(|_| {
            warn!("Unparseable timestamp '{s}', using current time");
            Utc::now()
        }),
    }
}

/// Split a comma-separated tag list: entries trimmed, empties dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a monetary amount: must be a finite, positive number.
pub fn parse_amount(raw: &str) -> Result<f64, CoreError> {
    let amount: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidInput(format!("Not a number: '{raw}'")))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "Amount must be positive, got {amount}"
        )));
    }
    Ok(amount)
}

/// Validate an account name: trimmed, non-empty.
pub fn validate_account_name(raw: &str) -> Result<String, CoreError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidInput(
            "Account name must not be empty".into(),
        ));
    }
    Ok(name.to_string())
}
