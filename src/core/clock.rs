use crate::core::geo::{self, nearest_perimeter, within_radius};
use crate::db::log::audit;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::clock_record::ClockRecord;
use crate::models::location::GeoPoint;
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};

/// Empty or whitespace-only notes are stored as NULL.
fn clean_note(note: Option<&str>) -> Option<&str> {
    note.map(str::trim).filter(|n| !n.is_empty())
}

/// Clock-in / clock-out transitions. Each call runs inside a
/// `BEGIN IMMEDIATE` transaction so the read-then-write is serialized
/// against other writers.
pub struct ClockLogic;

impl ClockLogic {
    /// OUT → IN. Checks run in order: coordinates, active session,
    /// perimeters, containment.
    pub fn clock_in(
        conn: &mut Connection,
        user_id: &str,
        point: GeoPoint,
        note: Option<&str>,
    ) -> AppResult<ClockRecord> {
        let point = geo::validate_coordinate(point)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if queries::find_active_record(&tx, user_id)?.is_some() {
            return Err(AppError::AlreadyClockedIn);
        }

        let perimeters = queries::load_all_perimeters(&tx)?;
        let (nearest, distance) = nearest_perimeter(point, &perimeters)?;

        if !within_radius(distance, nearest.radius) {
            tracing::debug!(
                user_id,
                perimeter = %nearest.id,
                distance,
                radius = nearest.radius,
                "clock-in rejected outside perimeter"
            );
            return Err(AppError::OutsidePerimeter {
                distance_meters: distance.round() as i64,
            });
        }

        let record = queries::insert_clock_in(&tx, user_id, Utc::now(), point, clean_note(note))?;
        audit(
            &tx,
            "clock_in",
            user_id,
            &format!("Clocked in at {} ({:.0} m)", nearest.name, distance),
        )?;

        tx.commit()?;
        Ok(record)
    }

    /// IN → OUT. No perimeter check on the way out.
    pub fn clock_out(
        conn: &mut Connection,
        user_id: &str,
        point: GeoPoint,
        note: Option<&str>,
    ) -> AppResult<ClockRecord> {
        let point = geo::validate_coordinate(point)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let active = queries::find_active_record(&tx, user_id)?.ok_or(AppError::NotClockedIn)?;

        // Never earlier than the clock-in, even if the wall clock stepped back.
        let at = Utc::now().max(active.clock_in_at);
        let note = clean_note(note);

        if !queries::close_record(&tx, &active.id, at, point, note)? {
            return Err(AppError::NotClockedIn);
        }
        audit(&tx, "clock_out", user_id, "Clocked out")?;

        tx.commit()?;

        Ok(ClockRecord {
            clock_out_at: Some(at),
            clock_out_lat: Some(point.latitude),
            clock_out_long: Some(point.longitude),
            clock_out_note: note.map(str::to_string),
            ..active
        })
    }
}
