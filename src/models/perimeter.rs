use super::location::GeoPoint;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Circular geofence owned by a manager.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Perimeter {
    pub id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius in meters, always > 0.
    pub radius: f64,
    pub manager_id: String,
    pub created_at: DateTime<Utc>,
}

impl Perimeter {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Validated input for creating a perimeter.
#[derive(Debug, Clone)]
pub struct NewPerimeter {
    pub name: String,
    pub location: String,
    pub center: GeoPoint,
    pub radius: f64,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PerimeterChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}
