use crate::models::clock_record::ClockRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub date: String, // YYYY-MM-DD (UTC)
    pub avg_hours: f64,
    pub people_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTotal {
    pub user_id: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub range: Window,
    pub avg_hours_per_day: Vec<DayStats>,
    pub total_hours_per_staff_last_week: Vec<UserTotal>,
}

#[derive(Default)]
struct DayBucket {
    durations_ms: Vec<i64>,
    users: BTreeSet<String>,
}

/// Round to 2 decimals.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Clip a record to `[from, to]`; open records run until `now`.
/// Returns `None` when the clipped interval is empty or inverted.
pub fn clip_interval(
    record: &ClockRecord,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = record.clock_in_at.max(from);
    let end = record.clock_out_at.unwrap_or(now).min(to);

    (end > start).then_some((start, end))
}

/// Per-day averages and per-user totals over `[from, to]`.
///
/// Each interval is bucketed by the UTC date of its clipped start, so a
/// night shift counts entirely towards the day it began in the window.
pub fn aggregate(
    records: &[ClockRecord],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Dashboard {
    let mut per_day: BTreeMap<String, DayBucket> = BTreeMap::new();
    let mut per_user: BTreeMap<String, i64> = BTreeMap::new();

    // -----------------------------
    // Clip + accumulate
    // -----------------------------
    for r in records {
        let Some((start, end)) = clip_interval(r, from, to, now) else {
            continue;
        };

        let dur = (end - start).num_milliseconds();
        *per_user.entry(r.user_id.clone()).or_insert(0) += dur;

        let bucket = per_day
            .entry(start.format("%Y-%m-%d").to_string())
            .or_default();
        bucket.durations_ms.push(dur);
        bucket.users.insert(r.user_id.clone());
    }

    // -----------------------------
    // Day averages (BTreeMap → sorted by date)
    // -----------------------------
    let avg_hours_per_day = per_day
        .into_iter()
        .map(|(date, b)| {
            let avg_hours = if b.durations_ms.is_empty() {
                0.0
            } else {
                let sum: i64 = b.durations_ms.iter().sum();
                round2(sum as f64 / b.durations_ms.len() as f64 / MS_PER_HOUR)
            };
            DayStats {
                date,
                avg_hours,
                people_count: b.users.len(),
            }
        })
        .collect();

    let total_hours_per_staff_last_week = per_user
        .into_iter()
        .map(|(user_id, ms)| UserTotal {
            user_id,
            hours: round2(ms as f64 / MS_PER_HOUR),
        })
        .collect();

    Dashboard {
        range: Window { from, to },
        avg_hours_per_day,
        total_hours_per_staff_last_week,
    }
}
