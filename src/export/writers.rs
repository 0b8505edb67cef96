use crate::errors::{AppError, AppResult};
use crate::export::{RecordExport, notify_export_success};
use crate::ui::messages::info;
use std::fs;
use std::path::Path;

pub(crate) fn export_json(rows: &[RecordExport], path: &Path) -> AppResult<()> {
    info(format!("Exporting to JSON: {}", path.display()));

    let json = serde_json::to_string_pretty(rows)
        .map_err(|e| AppError::Other(format!("JSON serialization error: {e}")))?;
    fs::write(path, json)?;

    notify_export_success("JSON", rows.len(), path);
    Ok(())
}

/// Header row comes from the serde field names.
pub(crate) fn export_csv(rows: &[RecordExport], path: &Path) -> AppResult<()> {
    info(format!("Exporting to CSV: {}", path.display()));

    let csv_err = |e: csv::Error| AppError::Other(format!("CSV error: {e}"));
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        wtr.serialize(row).map_err(csv_err)?;
    }
    wtr.flush()?;

    notify_export_success("CSV", rows.len(), path);
    Ok(())
}
