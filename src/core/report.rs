use crate::core::calculator::aggregate::{Dashboard, aggregate};
use crate::core::calculator::window::resolve_window;
use crate::core::policy::{Principal, can_view_logs, require_manager};
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::clock_record::{ActiveShift, ClockRecord};
use crate::utils::date::parse_instant;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

fn optional_instant(raw: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_instant(s)
            .map(Some)
            .ok_or_else(|| AppError::InvalidDate(s.to_string())),
        None => Ok(None),
    }
}

pub struct ReportLogic;

impl ReportLogic {
    /// Aggregates over the resolved window. Records are selected by overlap
    /// with the window, then clipped by the aggregator.
    pub fn dashboard(
        conn: &Connection,
        principal: &Principal,
        days: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Dashboard> {
        require_manager(principal)?;
        Self::dashboard_unchecked(conn, days, from, to, now)
    }

    /// Same as [`ReportLogic::dashboard`] without a caller (local CLI).
    pub fn dashboard_unchecked(
        conn: &Connection,
        days: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Dashboard> {
        let (from, to) = resolve_window(days, from, to, now)?;
        let records = queries::load_records_overlapping(conn, None, Some(from), Some(to))?;
        Ok(aggregate(&records, from, to, now))
    }

    /// A user's records, newest first, optionally limited to those
    /// overlapping `[from, to]`.
    pub fn user_logs(
        conn: &Connection,
        principal: &Principal,
        user_id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> AppResult<Vec<ClockRecord>> {
        can_view_logs(principal, user_id)?;

        let from = optional_instant(from)?;
        let to = optional_instant(to)?;
        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(AppError::Validation(
                "'from' must not be after 'to'".to_string(),
            ));
        }

        queries::load_records_overlapping(conn, Some(user_id), from, to)
    }

    pub fn active_staff(conn: &Connection, principal: &Principal) -> AppResult<Vec<ActiveShift>> {
        require_manager(principal)?;
        queries::load_active_shifts(conn)
    }
}
