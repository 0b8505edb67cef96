#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, TimeZone, Utc};
use staffclock::db::pool::DbPool;
use staffclock::db::queries;
use staffclock::models::location::GeoPoint;
use staffclock::models::perimeter::NewPerimeter;
use staffclock::models::role::Role;
use staffclock::models::user::{AuthProvider, User};
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn sc() -> Command {
    cargo_bin_cmd!("staffclock")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{name}_staffclock.sqlite"));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    db_path
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{name}_out.{ext}"));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, day, hour, 0, 0).unwrap()
}

fn add_user(pool: &DbPool, email: &str, role: Role) -> String {
    let user = User {
        id: queries::new_id(),
        email: email.to_string(),
        name: email.split('@').next().unwrap().to_string(),
        role,
        provider: AuthProvider::Password,
        password_hash: None,
        created_at: Utc::now(),
    };
    queries::insert_user(&pool.conn, &user).expect("insert user");
    user.id
}

fn add_shift(pool: &DbPool, user_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
    let here = GeoPoint::new(12.9629, 77.5775);
    let rec = queries::insert_clock_in(&pool.conn, user_id, start, here, Some("seed")).expect("clock in");
    queries::close_record(&pool.conn, &rec.id, end, here, None).expect("clock out");
}

/// Initialize DB and add a small dataset useful for many tests:
/// - alice: 2025-09-01 09–17, 2025-09-15 09–13
/// - bob:   2025-09-01 10–12
/// - one perimeter "HQ" (200 m) owned by the manager
pub fn init_db_with_data(db_path: &str) {
    sc().args(["--db", db_path, "--test", "init"])
        .assert()
        .success();

    let pool = DbPool::new(db_path).expect("open db");
    let alice = add_user(&pool, "alice@example.com", Role::Worker);
    let bob = add_user(&pool, "bob@example.com", Role::Worker);
    let boss = add_user(&pool, "boss@example.com", Role::Manager);

    queries::insert_perimeter(
        &pool.conn,
        &boss,
        &NewPerimeter {
            name: "HQ".into(),
            location: "Bengaluru office".into(),
            center: GeoPoint::new(12.9629, 77.5775),
            radius: 200.0,
        },
    )
    .expect("insert perimeter");

    add_shift(&pool, &alice, at(1, 9), at(1, 17));
    add_shift(&pool, &bob, at(1, 10), at(1, 12));
    add_shift(&pool, &alice, at(15, 9), at(15, 13));
}
