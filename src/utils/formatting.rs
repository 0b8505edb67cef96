//! Formatting utilities used for CLI outputs.

/// Decimal hours → `08h 30m`.
pub fn hours2readable(hours: f64) -> String {
    let mins = (hours * 60.0).round() as i64;
    let sign = if mins < 0 { "-" } else { "" };
    let m = mins.abs();
    format!("{sign}{:02}h {:02}m", m / 60, m % 60)
}

/// `850 m` below one kilometer, `1.25 km` above.
pub fn meters2readable(meters: f64) -> String {
    if meters.abs() < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}
