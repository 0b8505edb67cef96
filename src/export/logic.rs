use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::export::ExportFormat;
use crate::export::fs_utils::ensure_writable;
use crate::export::model::RecordExport;
use crate::export::range::parse_range;
use crate::export::writers::{export_csv, export_json};
use crate::ui::messages::warning;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::path::Path;

/// Day span → instant bounds `[start 00:00, end 23:59:59.999]`.
fn day_bounds((start, end): (NaiveDate, NaiveDate)) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start.and_time(chrono::NaiveTime::MIN).and_utc();
    let to = (end + Duration::days(1)).and_time(chrono::NaiveTime::MIN).and_utc()
        - Duration::milliseconds(1);
    (from, to)
}

pub struct ExportLogic;

impl ExportLogic {
    /// Export clock records overlapping `range` (all records when `None`
    /// or `"all"`), oldest first.
    ///
    /// Returns the number of exported rows.
    pub fn export(
        pool: &DbPool,
        format: ExportFormat,
        file: &str,
        range: Option<&str>,
        force: bool,
    ) -> AppResult<usize> {
        let path = Path::new(file);
        if !path.is_absolute() {
            return Err(AppError::Validation(format!(
                "Output file path must be absolute: {file}"
            )));
        }

        let bounds = match range {
            None => None,
            Some(r) if r.eq_ignore_ascii_case("all") => None,
            Some(r) => Some(day_bounds(parse_range(r)?)),
        };

        ensure_writable(path, force)?;

        let rows = load_rows(pool, bounds)?;
        if rows.is_empty() {
            warning("No clock records found for the selected range. Nothing to export.");
            return Ok(0);
        }

        match format {
            ExportFormat::Csv => export_csv(&rows, path)?,
            ExportFormat::Json => export_json(&rows, path)?,
        }

        Ok(rows.len())
    }
}

fn load_rows(
    pool: &DbPool,
    bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> AppResult<Vec<RecordExport>> {
    let emails: HashMap<String, String> = queries::list_users(&pool.conn)?
        .into_iter()
        .map(|u| (u.id, u.email))
        .collect();

    let mut records =
        queries::load_records_overlapping(&pool.conn, None, bounds.map(|b| b.0), bounds.map(|b| b.1))?;
    records.reverse();

    Ok(records
        .iter()
        .map(|r| {
            let email = emails.get(&r.user_id).map(String::as_str).unwrap_or("");
            RecordExport::from_record(r, email)
        })
        .collect())
}
