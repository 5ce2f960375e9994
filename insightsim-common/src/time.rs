//! Timestamp utilities
//!
//! Samples store time as integer milliseconds since the Unix epoch (UTC).
//! Text timestamps arrive from feed files, CSV uploads and query paths in a
//! handful of ISO-8601 shapes; all of them resolve to UTC here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};

use crate::{Error, Result};

/// Naive layouts accepted after RFC 3339 fails. Naive values are taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Output layout for data points
const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as RFC 3339 text with second precision (tag registry columns)
pub fn now_rfc3339() -> String {
    now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a textual timestamp into milliseconds since epoch (UTC)
///
/// Accepts `T` or space separators, optional fractional seconds, an optional
/// trailing `Z`, RFC 3339 offsets (converted to UTC) and bare `YYYY-MM-DD`
/// dates (UTC midnight).
///
/// # Examples
/// ```
/// use insightsim_common::time::parse_timestamp;
///
/// assert_eq!(parse_timestamp("1970-01-01T00:00:01").unwrap(), 1_000);
/// assert_eq!(parse_timestamp("1970-01-01 00:00:01.500Z").unwrap(), 1_500);
/// assert!(parse_timestamp("yesterday").is_err());
/// ```
pub fn parse_timestamp(text: &str) -> Result<i64> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }

    let naive = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    for format in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive, format) {
            return Ok(Utc.from_utc_datetime(&ndt).timestamp_millis());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight).timestamp_millis());
        }
    }

    Err(Error::InvalidInput(format!("unable to parse timestamp: {}", text)))
}

/// Convert milliseconds since epoch to a UTC datetime
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Format milliseconds since epoch as `YYYY-MM-DDTHH:MM:SS` (UTC)
///
/// A `.mmm` fraction is appended only when the millisecond part is non-zero,
/// so whole-second samples keep the short form.
pub fn format_timestamp(millis: i64) -> String {
    match from_millis(millis) {
        Some(dt) if dt.nanosecond() / 1_000_000 != 0 => dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        Some(dt) => dt.format(OUTPUT_FORMAT).to_string(),
        None => millis.to_string(),
    }
}
