use crate::errors::{AppError, AppResult};
use chrono::{Datelike, NaiveDate};

fn invalid(what: &str, raw: &str) -> AppError {
    AppError::InvalidDate(format!("{what}: '{raw}'"))
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt().map(|d| d.day())
}

/// One period token: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, as an inclusive
/// day span.
fn period(token: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let t = token.trim();
    match t.len() {
        4 => {
            let y: i32 = t.parse().map_err(|_| invalid("invalid year", t))?;
            let first = NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(|| invalid("invalid year", t))?;
            let last = NaiveDate::from_ymd_opt(y, 12, 31).ok_or_else(|| invalid("invalid year", t))?;
            Ok((first, last))
        }
        7 => {
            let first = NaiveDate::parse_from_str(&format!("{t}-01"), "%Y-%m-%d")
                .map_err(|_| invalid("invalid month", t))?;
            let last_day = last_day_of_month(first.year(), first.month())
                .ok_or_else(|| invalid("invalid month", t))?;
            let last = first
                .with_day(last_day)
                .ok_or_else(|| invalid("invalid month", t))?;
            Ok((first, last))
        }
        10 => {
            let d = NaiveDate::parse_from_str(t, "%Y-%m-%d").map_err(|_| invalid("invalid date", t))?;
            Ok((d, d))
        }
        _ => Err(invalid("unsupported --range format", t)),
    }
}

/// Parse `--range`: a single period or `START:END` with both sides in the
/// same format. Returns inclusive calendar days.
pub fn parse_range(r: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let Some((start_raw, end_raw)) = r.split_once(':') else {
        return period(r);
    };

    let (start_raw, end_raw) = (start_raw.trim(), end_raw.trim());
    if start_raw.len() != end_raw.len() {
        return Err(invalid("start and end must have same format", r));
    }

    let (start, _) = period(start_raw)?;
    let (_, end) = period(end_raw)?;
    if start > end {
        return Err(invalid("range start is after its end", r));
    }

    Ok((start, end))
}
