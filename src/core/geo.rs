//! Geofence evaluation: haversine distance, nearest perimeter lookup and
//! tolerant parsing of coordinate / radius inputs.

use crate::errors::{AppError, AppResult};
use crate::models::location::GeoPoint;
use crate::models::perimeter::Perimeter;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

static NON_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.+\-]").unwrap());

static LEADING_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+\-]?(\d+\.?\d*|\.\d+)([eE][+\-]?\d+)?").unwrap());

/// Great-circle distance between two points, in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `h` just past 1 near the antipode.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Nearest perimeter to `point`. Ties keep the first one encountered.
pub fn nearest_perimeter<'a>(
    point: GeoPoint,
    perimeters: &'a [Perimeter],
) -> AppResult<(&'a Perimeter, f64)> {
    let mut iter = perimeters.iter();
    let first = iter.next().ok_or(AppError::NoPerimetersConfigured)?;

    let mut nearest = first;
    let mut min_dist = haversine_m(point, first.center());

    for p in iter {
        let d = haversine_m(point, p.center());
        if d < min_dist || min_dist.is_nan() {
            min_dist = d;
            nearest = p;
        }
    }

    Ok((nearest, min_dist))
}

/// Inclusive radius containment. A NaN distance is never inside.
pub fn within_radius(distance: f64, radius: f64) -> bool {
    distance <= radius
}

pub fn is_within(point: GeoPoint, perimeter: &Perimeter) -> bool {
    within_radius(haversine_m(point, perimeter.center()), perimeter.radius)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestInfo {
    pub id: String,
    pub name: String,
    pub distance_meters: i64,
    pub radius_meters: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithinCheck {
    pub inside: bool,
    pub nearest: Option<NearestInfo>,
}

/// Snapshot check of a point against every perimeter.
/// No perimeters is not an error here: the point is simply outside.
pub fn check_within(point: GeoPoint, perimeters: &[Perimeter]) -> WithinCheck {
    match nearest_perimeter(point, perimeters) {
        Ok((p, dist)) => WithinCheck {
            inside: within_radius(dist, p.radius),
            nearest: Some(NearestInfo {
                id: p.id.clone(),
                name: p.name.clone(),
                distance_meters: dist.round() as i64,
                radius_meters: p.radius,
            }),
        },
        Err(_) => WithinCheck {
            inside: false,
            nearest: None,
        },
    }
}

// ---------------------------
// Input parsing
// ---------------------------

/// Parse the longest leading float literal, like a lenient `parseFloat`.
fn parse_leading_float(s: &str) -> f64 {
    LEADING_FLOAT
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Parse a decorated coordinate string such as `"12.9629° N"` or
/// `"77.5775° W"`. A trailing S or W negates the magnitude.
/// Returns NaN when nothing numeric can be extracted.
pub fn parse_coordinate_str(input: &str) -> f64 {
    let trimmed = input.trim().to_uppercase();
    let sign = if trimmed.ends_with('S') || trimmed.ends_with('W') {
        -1.0
    } else {
        1.0
    };

    let numeric = NON_NUMERIC.replace_all(&trimmed, "");
    let val = parse_leading_float(&numeric);

    if val.is_finite() { val * sign } else { f64::NAN }
}

/// Coordinate from an arbitrary JSON value: numbers pass through,
/// strings go through [`parse_coordinate_str`], anything else is NaN.
pub fn parse_coordinate(input: Option<&Value>) -> f64 {
    match input {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_coordinate_str(s),
        _ => f64::NAN,
    }
}

fn numeric_value(input: Option<&Value>) -> Option<f64> {
    let v = match input? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_leading_float(s),
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Radius in meters. `radius_meters` wins over `radius_km` (× 1000).
pub fn parse_meters(radius_meters: Option<&Value>, radius_km: Option<&Value>) -> Option<f64> {
    if let Some(m) = numeric_value(radius_meters) {
        return Some(m);
    }
    numeric_value(radius_km).map(|km| km * 1000.0)
}

/// Reject non-finite and out-of-range coordinates.
pub fn validate_coordinate(point: GeoPoint) -> AppResult<GeoPoint> {
    if !point.is_finite() {
        return Err(AppError::InvalidCoordinates);
    }
    if !point.in_range() {
        return Err(AppError::Validation(
            "Latitude/Longitude out of range".to_string(),
        ));
    }
    Ok(point)
}

/// Parse + validate a latitude/longitude pair coming from a request.
pub fn point_from_inputs(latitude: Option<&Value>, longitude: Option<&Value>) -> AppResult<GeoPoint> {
    validate_coordinate(GeoPoint::new(
        parse_coordinate(latitude),
        parse_coordinate(longitude),
    ))
}
