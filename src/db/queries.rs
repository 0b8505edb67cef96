use crate::errors::{AppError, AppResult};
use crate::models::clock_record::{ActiveShift, ClockRecord};
use crate::models::location::GeoPoint;
use crate::models::perimeter::{NewPerimeter, Perimeter, PerimeterChanges};
use crate::models::role::Role;
use crate::models::user::{AuthProvider, User, UserSummary};
use crate::utils::date::{from_db_timestamp, to_db_timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use uuid::Uuid;

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(AppError::Other(msg)),
    )
}

fn get_timestamp(row: &Row, col: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(col)?;
    from_db_timestamp(&raw).ok_or_else(|| conversion_error(0, format!("Invalid timestamp: {raw}")))
}

fn get_opt_timestamp(row: &Row, col: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(col)?;
    raw.map(|s| {
        from_db_timestamp(&s).ok_or_else(|| conversion_error(0, format!("Invalid timestamp: {s}")))
    })
    .transpose()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------
// Users
// ---------------------------

const USER_COLUMNS: &str = "id, email, name, role, provider, password_hash, created_at";

pub fn map_user(row: &Row) -> Result<User> {
    let role_str: String = row.get("role")?;
    let role = Role::from_db_str(&role_str)
        .ok_or_else(|| conversion_error(0, format!("Invalid role: {role_str}")))?;

    let provider_str: String = row.get("provider")?;
    let provider = AuthProvider::from_db_str(&provider_str)
        .ok_or_else(|| conversion_error(0, format!("Invalid provider: {provider_str}")))?;

    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        role,
        provider,
        password_hash: row.get("password_hash")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> AppResult<()> {
    let res = conn.execute(
        "INSERT INTO users (id, email, name, role, provider, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.email,
            user.name,
            user.role.to_db_str(),
            user.provider.to_db_str(),
            user.password_hash,
            to_db_timestamp(&user.created_at),
        ],
    );

    match res {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(AppError::UserExists),
        Err(e) => Err(e.into()),
    }
}

pub fn find_user_by_id(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_user).optional()?)
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    Ok(conn.query_row(&sql, [email], map_user).optional()?)
}

pub fn update_user_role(conn: &Connection, id: &str, role: Role) -> AppResult<bool> {
    let n = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.to_db_str(), id],
    )?;
    Ok(n == 1)
}

pub fn update_user_name(conn: &Connection, id: &str, name: &str) -> AppResult<()> {
    conn.execute("UPDATE users SET name = ?1 WHERE id = ?2", params![name, id])?;
    Ok(())
}

pub fn list_users(conn: &Connection) -> AppResult<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY email ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_user)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ---------------------------
// Perimeters
// ---------------------------

const PERIMETER_COLUMNS: &str =
    "id, name, location, latitude, longitude, radius, manager_id, created_at";

pub fn map_perimeter(row: &Row) -> Result<Perimeter> {
    Ok(Perimeter {
        id: row.get("id")?,
        name: row.get("name")?,
        location: row.get("location")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        radius: row.get("radius")?,
        manager_id: row.get("manager_id")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

pub fn insert_perimeter(
    conn: &Connection,
    manager_id: &str,
    input: &NewPerimeter,
) -> AppResult<Perimeter> {
    let perimeter = Perimeter {
        id: new_id(),
        name: input.name.clone(),
        location: input.location.clone(),
        latitude: input.center.latitude,
        longitude: input.center.longitude,
        radius: input.radius,
        manager_id: manager_id.to_string(),
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO perimeters (id, name, location, latitude, longitude, radius, manager_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            perimeter.id,
            perimeter.name,
            perimeter.location,
            perimeter.latitude,
            perimeter.longitude,
            perimeter.radius,
            perimeter.manager_id,
            to_db_timestamp(&perimeter.created_at),
        ],
    )?;

    Ok(perimeter)
}

/// Every perimeter, in creation order (stable for nearest-perimeter ties).
pub fn load_all_perimeters(conn: &Connection) -> AppResult<Vec<Perimeter>> {
    let sql = format!("SELECT {PERIMETER_COLUMNS} FROM perimeters ORDER BY created_at ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_perimeter)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Perimeters owned by `manager_id`, newest first.
pub fn load_perimeters_for_manager(conn: &Connection, manager_id: &str) -> AppResult<Vec<Perimeter>> {
    let sql = format!(
        "SELECT {PERIMETER_COLUMNS} FROM perimeters WHERE manager_id = ?1 ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([manager_id], map_perimeter)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Owner-scoped lookup: another manager's perimeter is indistinguishable
/// from a missing one.
pub fn find_owned_perimeter(
    conn: &Connection,
    id: &str,
    manager_id: &str,
) -> AppResult<Option<Perimeter>> {
    let sql = format!("SELECT {PERIMETER_COLUMNS} FROM perimeters WHERE id = ?1 AND manager_id = ?2");
    Ok(conn
        .query_row(&sql, params![id, manager_id], map_perimeter)
        .optional()?)
}

pub fn update_perimeter(
    conn: &Connection,
    existing: &Perimeter,
    changes: &PerimeterChanges,
) -> AppResult<Perimeter> {
    let updated = Perimeter {
        name: changes.name.clone().unwrap_or_else(|| existing.name.clone()),
        location: changes
            .location
            .clone()
            .unwrap_or_else(|| existing.location.clone()),
        latitude: changes.latitude.unwrap_or(existing.latitude),
        longitude: changes.longitude.unwrap_or(existing.longitude),
        radius: changes.radius.unwrap_or(existing.radius),
        ..existing.clone()
    };

    conn.execute(
        "UPDATE perimeters
         SET name = ?1, location = ?2, latitude = ?3, longitude = ?4, radius = ?5
         WHERE id = ?6 AND manager_id = ?7",
        params![
            updated.name,
            updated.location,
            updated.latitude,
            updated.longitude,
            updated.radius,
            updated.id,
            updated.manager_id,
        ],
    )?;

    Ok(updated)
}

pub fn delete_perimeter(conn: &Connection, id: &str, manager_id: &str) -> AppResult<bool> {
    let n = conn.execute(
        "DELETE FROM perimeters WHERE id = ?1 AND manager_id = ?2",
        params![id, manager_id],
    )?;
    Ok(n == 1)
}

// ---------------------------
// Clock records
// ---------------------------

const RECORD_COLUMNS: &str = "id, user_id, clock_in_at, clock_in_lat, clock_in_long, clock_in_note,
     clock_out_at, clock_out_lat, clock_out_long, clock_out_note";

pub fn map_record(row: &Row) -> Result<ClockRecord> {
    Ok(ClockRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        clock_in_at: get_timestamp(row, "clock_in_at")?,
        clock_in_lat: row.get("clock_in_lat")?,
        clock_in_long: row.get("clock_in_long")?,
        clock_in_note: row.get("clock_in_note")?,
        clock_out_at: get_opt_timestamp(row, "clock_out_at")?,
        clock_out_lat: row.get("clock_out_lat")?,
        clock_out_long: row.get("clock_out_long")?,
        clock_out_note: row.get("clock_out_note")?,
    })
}

pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn insert_clock_in(
    conn: &Connection,
    user_id: &str,
    at: DateTime<Utc>,
    point: GeoPoint,
    note: Option<&str>,
) -> AppResult<ClockRecord> {
    let record = ClockRecord {
        id: new_id(),
        user_id: user_id.to_string(),
        clock_in_at: at,
        clock_in_lat: point.latitude,
        clock_in_long: point.longitude,
        clock_in_note: note.map(str::to_string),
        clock_out_at: None,
        clock_out_lat: None,
        clock_out_long: None,
        clock_out_note: None,
    };

    let res = conn.execute(
        "INSERT INTO clock_records (id, user_id, clock_in_at, clock_in_lat, clock_in_long, clock_in_note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.user_id,
            to_db_timestamp(&record.clock_in_at),
            record.clock_in_lat,
            record.clock_in_long,
            record.clock_in_note,
        ],
    );

    match res {
        Ok(_) => Ok(record),
        Err(e) if is_unique_violation(&e) => Err(AppError::AlreadyClockedIn),
        Err(e) => Err(e.into()),
    }
}

/// Most recent open record for the user, if any.
pub fn find_active_record(conn: &Connection, user_id: &str) -> AppResult<Option<ClockRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM clock_records
         WHERE user_id = ?1 AND clock_out_at IS NULL
         ORDER BY clock_in_at DESC
         LIMIT 1"
    );
    Ok(conn.query_row(&sql, [user_id], map_record).optional()?)
}

/// Close an open record. Returns `false` if it was already closed.
pub fn close_record(
    conn: &Connection,
    record_id: &str,
    at: DateTime<Utc>,
    point: GeoPoint,
    note: Option<&str>,
) -> AppResult<bool> {
    let n = conn.execute(
        "UPDATE clock_records
         SET clock_out_at = ?1, clock_out_lat = ?2, clock_out_long = ?3, clock_out_note = ?4
         WHERE id = ?5 AND clock_out_at IS NULL",
        params![
            to_db_timestamp(&at),
            point.latitude,
            point.longitude,
            note,
            record_id,
        ],
    )?;
    Ok(n == 1)
}

/// Every open record joined with its owner, newest clock-in first.
pub fn load_active_shifts(conn: &Connection) -> AppResult<Vec<ActiveShift>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.user_id, r.clock_in_at, r.clock_in_lat, r.clock_in_long, r.clock_in_note,
                r.clock_out_at, r.clock_out_lat, r.clock_out_long, r.clock_out_note,
                u.name AS user_name, u.email AS user_email, u.role AS user_role
         FROM clock_records r
         JOIN users u ON u.id = r.user_id
         WHERE r.clock_out_at IS NULL
         ORDER BY r.clock_in_at DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        let record = map_record(row)?;
        let role_str: String = row.get("user_role")?;
        let role = Role::from_db_str(&role_str)
            .ok_or_else(|| conversion_error(0, format!("Invalid role: {role_str}")))?;
        Ok(ActiveShift {
            user: UserSummary {
                id: record.user_id.clone(),
                name: row.get("user_name")?,
                email: row.get("user_email")?,
                role,
            },
            record,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Records overlapping `[from, to]`, optionally for one user, newest first.
/// Open records overlap as long as they started before `to`.
pub fn load_records_overlapping(
    conn: &Connection,
    user_id: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> AppResult<Vec<ClockRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM clock_records
         WHERE (?1 IS NULL OR user_id = ?1)
           AND (?2 IS NULL OR clock_out_at IS NULL OR clock_out_at >= ?2)
           AND (?3 IS NULL OR clock_in_at <= ?3)
         ORDER BY clock_in_at DESC"
    );

    let from_s = from.as_ref().map(to_db_timestamp);
    let to_s = to.as_ref().map(to_db_timestamp);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, from_s, to_s], map_record)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
