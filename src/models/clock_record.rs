use super::user::UserSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One shift: opened by clock-in, closed once by clock-out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockRecord {
    pub id: String,
    pub user_id: String,
    pub clock_in_at: DateTime<Utc>,
    pub clock_in_lat: f64,
    pub clock_in_long: f64,
    pub clock_in_note: Option<String>,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub clock_out_lat: Option<f64>,
    pub clock_out_long: Option<f64>,
    pub clock_out_note: Option<String>,
}

impl ClockRecord {
    pub fn is_active(&self) -> bool {
        self.clock_out_at.is_none()
    }
}

/// Active record joined with its owner, for the staff-on-shift listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveShift {
    #[serde(flatten)]
    pub record: ClockRecord,
    pub user: UserSummary,
}
