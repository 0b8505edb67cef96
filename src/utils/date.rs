//! Date helpers: parsing request/CLI instants and fixed-width storage format.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Storage format: RFC 3339, UTC, millisecond precision. Fixed width, so
/// lexicographic order in SQL equals chronological order.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn from_db_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Years outside this range do not format as fixed-width timestamps.
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Parse a user supplied instant.
///
/// Accepts RFC 3339 (`2025-03-10T09:00:00Z`), a naive date-time
/// (`2025-03-10T09:00[:SS]`, read as UTC) or a bare date (UTC midnight).
/// Years must fall in `0..=9999`.
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    parse_any_instant(s.trim()).filter(|dt| (MIN_YEAR..=MAX_YEAR).contains(&dt.year()))
}

fn parse_any_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Some(dt) = from_db_timestamp(s) {
        return Some(dt);
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}
