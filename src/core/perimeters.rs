//! Perimeter management, scoped to the owning manager.
//!
//! Ownership is enforced in the storage query: a perimeter owned by someone
//! else is reported as `NotFound`, never `Forbidden`.

use crate::core::geo::{self, WithinCheck, parse_coordinate, parse_meters};
use crate::core::policy::{Principal, require_manager};
use crate::db::log::audit;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::location::GeoPoint;
use crate::models::perimeter::{NewPerimeter, Perimeter, PerimeterChanges};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

/// Raw create/update payload. Coordinates and radius may be numbers or
/// decorated strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerimeterInput {
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub radius_meters: Option<Value>,
    pub radius_km: Option<Value>,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_radius(radius: Option<f64>) -> AppResult<f64> {
    match radius {
        Some(r) if r > 0.0 => Ok(r),
        Some(_) => Err(AppError::Validation("Radius must be positive".into())),
        None => Err(AppError::Validation(
            "radiusMeters or radiusKm is required".into(),
        )),
    }
}

/// Single latitude or longitude from an optional raw value.
fn coordinate(value: Option<&Value>, max: f64, label: &str) -> AppResult<Option<f64>> {
    let Some(v) = value.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let c = parse_coordinate(Some(v));
    if !c.is_finite() {
        return Err(AppError::InvalidCoordinates);
    }
    if !(-max..=max).contains(&c) {
        return Err(AppError::Validation(format!("{label} out of range")));
    }
    Ok(Some(c))
}

impl PerimeterInput {
    fn into_new(self) -> AppResult<NewPerimeter> {
        let (Some(name), Some(location)) = (non_empty(&self.name), non_empty(&self.location)) else {
            return Err(AppError::Validation(
                "Name, location, latitude, longitude and radius are required".into(),
            ));
        };

        let center = geo::point_from_inputs(self.latitude.as_ref(), self.longitude.as_ref())?;
        let radius = check_radius(parse_meters(
            self.radius_meters.as_ref(),
            self.radius_km.as_ref(),
        ))?;

        Ok(NewPerimeter {
            name,
            location,
            center,
            radius,
        })
    }

    fn into_changes(self) -> AppResult<PerimeterChanges> {
        let radius_given = self.radius_meters.as_ref().is_some_and(|v| !v.is_null())
            || self.radius_km.as_ref().is_some_and(|v| !v.is_null());

        let radius = if radius_given {
            Some(check_radius(parse_meters(
                self.radius_meters.as_ref(),
                self.radius_km.as_ref(),
            ))?)
        } else {
            None
        };

        Ok(PerimeterChanges {
            name: non_empty(&self.name),
            location: non_empty(&self.location),
            latitude: coordinate(self.latitude.as_ref(), 90.0, "Latitude")?,
            longitude: coordinate(self.longitude.as_ref(), 180.0, "Longitude")?,
            radius,
        })
    }
}

pub struct PerimeterLogic;

impl PerimeterLogic {
    pub fn create(
        conn: &Connection,
        principal: &Principal,
        input: PerimeterInput,
    ) -> AppResult<Perimeter> {
        require_manager(principal)?;
        let new = input.into_new()?;

        let perimeter = queries::insert_perimeter(conn, &principal.user_id, &new)?;
        audit(
            conn,
            "perimeter_add",
            &perimeter.id,
            &format!("{} ({} m)", perimeter.name, perimeter.radius),
        )?;

        Ok(perimeter)
    }

    pub fn list(conn: &Connection, principal: &Principal) -> AppResult<Vec<Perimeter>> {
        require_manager(principal)?;
        queries::load_perimeters_for_manager(conn, &principal.user_id)
    }

    pub fn get(conn: &Connection, principal: &Principal, id: &str) -> AppResult<Perimeter> {
        require_manager(principal)?;
        queries::find_owned_perimeter(conn, id, &principal.user_id)?.ok_or(AppError::NotFound)
    }

    pub fn update(
        conn: &Connection,
        principal: &Principal,
        id: &str,
        input: PerimeterInput,
    ) -> AppResult<Perimeter> {
        let existing = Self::get(conn, principal, id)?;
        let changes = input.into_changes()?;

        let updated = queries::update_perimeter(conn, &existing, &changes)?;
        audit(conn, "perimeter_update", &updated.id, &updated.name)?;

        Ok(updated)
    }

    pub fn delete(conn: &Connection, principal: &Principal, id: &str) -> AppResult<()> {
        require_manager(principal)?;

        if !queries::delete_perimeter(conn, id, &principal.user_id)? {
            return Err(AppError::NotFound);
        }
        audit(conn, "perimeter_del", id, "Perimeter deleted")?;

        Ok(())
    }

    /// Point check against every perimeter, regardless of owner.
    pub fn check_within(conn: &Connection, point: GeoPoint) -> AppResult<WithinCheck> {
        let point = geo::validate_coordinate(point)?;
        let perimeters = queries::load_all_perimeters(conn)?;
        Ok(geo::check_within(point, &perimeters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize::init_db;
    use crate::db::pool::DbPool;
    use crate::models::role::Role;
    use crate::models::user::{AuthProvider, User};
    use chrono::Utc;
    use serde_json::json;

    fn setup() -> (DbPool, Principal, Principal) {
        let pool = DbPool::in_memory().unwrap();
        init_db(&pool.conn).unwrap();

        let mut ids = Vec::new();
        for email in ["a@x.io", "b@x.io"] {
            let user = User {
                id: queries::new_id(),
                email: email.into(),
                name: email.into(),
                role: Role::Manager,
                provider: AuthProvider::Password,
                password_hash: None,
                created_at: Utc::now(),
            };
            queries::insert_user(&pool.conn, &user).unwrap();
            ids.push(user.id);
        }

        let a = Principal::new(ids[0].clone(), Role::Manager);
        let b = Principal::new(ids[1].clone(), Role::Manager);
        (pool, a, b)
    }

    fn input(lat: Value, lon: Value) -> PerimeterInput {
        PerimeterInput {
            name: Some("HQ".into()),
            location: Some("Main street".into()),
            latitude: Some(lat),
            longitude: Some(lon),
            radius_meters: None,
            radius_km: Some(json!(0.5)),
        }
    }

    #[test]
    fn create_accepts_decorated_coordinates_and_km() {
        let (pool, a, _) = setup();
        let p = PerimeterLogic::create(&pool.conn, &a, input(json!("12.9629° N"), json!("77.5775° W")))
            .unwrap();
        assert!((p.latitude - 12.9629).abs() < 1e-9);
        assert!((p.longitude + 77.5775).abs() < 1e-9);
        assert_eq!(p.radius, 500.0);
        assert_eq!(p.manager_id, a.user_id);
    }

    #[test]
    fn create_validation() {
        let (pool, a, _) = setup();

        let mut missing_name = input(json!(1.0), json!(1.0));
        missing_name.name = Some("  ".into());
        assert!(matches!(
            PerimeterLogic::create(&pool.conn, &a, missing_name),
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            PerimeterLogic::create(&pool.conn, &a, input(json!("north"), json!(1.0))),
            Err(AppError::InvalidCoordinates)
        ));

        let mut zero = input(json!(1.0), json!(1.0));
        zero.radius_km = Some(json!(0));
        assert!(matches!(
            PerimeterLogic::create(&pool.conn, &a, zero),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn workers_cannot_create() {
        let (pool, a, _) = setup();
        let worker = Principal::new(a.user_id, Role::Worker);
        assert!(matches!(
            PerimeterLogic::create(&pool.conn, &worker, input(json!(1.0), json!(1.0))),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn other_managers_get_not_found() {
        let (pool, a, b) = setup();
        let p = PerimeterLogic::create(&pool.conn, &a, input(json!(1.0), json!(1.0))).unwrap();

        assert!(matches!(
            PerimeterLogic::get(&pool.conn, &b, &p.id),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            PerimeterLogic::update(&pool.conn, &b, &p.id, PerimeterInput::default()),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            PerimeterLogic::delete(&pool.conn, &b, &p.id),
            Err(AppError::NotFound)
        ));
        assert!(PerimeterLogic::list(&pool.conn, &b).unwrap().is_empty());
        assert_eq!(PerimeterLogic::list(&pool.conn, &a).unwrap().len(), 1);
    }

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let (pool, a, _) = setup();
        let p = PerimeterLogic::create(&pool.conn, &a, input(json!(1.0), json!(2.0))).unwrap();

        let changes = PerimeterInput {
            radius_meters: Some(json!(750)),
            ..PerimeterInput::default()
        };
        let updated = PerimeterLogic::update(&pool.conn, &a, &p.id, changes).unwrap();
        assert_eq!(updated.radius, 750.0);
        assert_eq!(updated.name, "HQ");
        assert_eq!(updated.latitude, 1.0);

        let bad = PerimeterInput {
            latitude: Some(json!(123)),
            ..PerimeterInput::default()
        };
        assert!(matches!(
            PerimeterLogic::update(&pool.conn, &a, &p.id, bad),
            Err(AppError::Validation(_))
        ));

        let reloaded = PerimeterLogic::get(&pool.conn, &a, &p.id).unwrap();
        assert_eq!(reloaded.radius, 750.0);
    }

    #[test]
    fn check_within_reports_nearest() {
        let (pool, a, _) = setup();
        let empty = PerimeterLogic::check_within(&pool.conn, GeoPoint::new(0.0, 0.0)).unwrap();
        assert!(!empty.inside);
        assert!(empty.nearest.is_none());

        PerimeterLogic::create(&pool.conn, &a, input(json!(0.0), json!(0.0))).unwrap();
        let inside = PerimeterLogic::check_within(&pool.conn, GeoPoint::new(0.001, 0.0)).unwrap();
        assert!(inside.inside);
        assert_eq!(inside.nearest.unwrap().name, "HQ");
    }
}
