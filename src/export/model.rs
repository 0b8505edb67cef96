use crate::models::clock_record::ClockRecord;
use crate::utils::date::to_db_timestamp;
use serde::Serialize;

/// Flat row for CSV / JSON export of one clock record.
#[derive(Serialize, Clone, Debug)]
pub struct RecordExport {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub clock_in_at: String,
    pub clock_in_lat: f64,
    pub clock_in_long: f64,
    pub clock_in_note: String,
    pub clock_out_at: String,
    pub clock_out_lat: Option<f64>,
    pub clock_out_long: Option<f64>,
    pub clock_out_note: String,
    /// Empty while the session is still open.
    pub hours: Option<f64>,
}

impl RecordExport {
    pub fn from_record(r: &ClockRecord, user_email: &str) -> Self {
        let hours = r.clock_out_at.map(|out| {
            let ms = (out - r.clock_in_at).num_milliseconds() as f64;
            (ms / 36_000.0).round() / 100.0
        });

        Self {
            id: r.id.clone(),
            user_id: r.user_id.clone(),
            user_email: user_email.to_string(),
            clock_in_at: to_db_timestamp(&r.clock_in_at),
            clock_in_lat: r.clock_in_lat,
            clock_in_long: r.clock_in_long,
            clock_in_note: r.clock_in_note.clone().unwrap_or_default(),
            clock_out_at: r.clock_out_at.as_ref().map(to_db_timestamp).unwrap_or_default(),
            clock_out_lat: r.clock_out_lat,
            clock_out_long: r.clock_out_long,
            clock_out_note: r.clock_out_note.clone().unwrap_or_default(),
            hours,
        }
    }
}
