use crate::errors::{AppError, AppResult};
use crate::utils::date::parse_instant;
use chrono::{DateTime, Datelike, Duration, Utc};

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Resolve the dashboard window from optional query inputs.
///
/// - `to` defaults to `now`
/// - `from` defaults to `to - days` (days defaults to 7)
pub fn resolve_window(
    days: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let to = match to {
        Some(s) => parse_instant(s).ok_or_else(|| AppError::InvalidDate(s.to_string()))?,
        None => now,
    };

    let from = match from {
        Some(s) => parse_instant(s).ok_or_else(|| AppError::InvalidDate(s.to_string()))?,
        None => {
            let days = match days.map(str::trim).filter(|d| !d.is_empty()) {
                Some(d) => d
                    .parse::<i64>()
                    .ok()
                    .filter(|n| *n > 0 && *n <= 3660)
                    .ok_or_else(|| AppError::Validation(format!("Invalid days value: {d}")))?,
                None => DEFAULT_WINDOW_DAYS,
            };
            to.checked_sub_signed(Duration::days(days))
                .filter(|f| f.year() >= 0)
                .ok_or_else(|| {
                    AppError::Validation(format!("Window of {days} days before {to} is out of range"))
                })?
        }
    };

    if from > to {
        return Err(AppError::Validation(
            "'from' must not be after 'to'".to_string(),
        ));
    }

    Ok((from, to))
}
