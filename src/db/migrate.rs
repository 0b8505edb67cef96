use crate::ui::messages::success;
use rusqlite::{Connection, OptionalExtension, Result};

/// Ensure that the `log` table exists. It doubles as the migration ledger.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn mark_applied(conn: &Connection, version: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    Ok(())
}

const CREATE_USERS: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id            TEXT PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        name          TEXT NOT NULL,
        role          TEXT NOT NULL DEFAULT 'worker' CHECK(role IN ('worker','manager','admin')),
        provider      TEXT NOT NULL DEFAULT 'password' CHECK(provider IN ('password','google')),
        password_hash TEXT,
        created_at    TEXT NOT NULL
    );
"#;

const CREATE_PERIMETERS: &str = r#"
    CREATE TABLE IF NOT EXISTS perimeters (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        location    TEXT NOT NULL,
        latitude    REAL NOT NULL CHECK(latitude BETWEEN -90 AND 90),
        longitude   REAL NOT NULL CHECK(longitude BETWEEN -180 AND 180),
        radius      REAL NOT NULL CHECK(radius > 0),
        manager_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at  TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_perimeters_manager ON perimeters(manager_id, created_at);
"#;

// The partial unique index is the storage-level guarantee of
// "at most one open record per user".
const CREATE_CLOCK_RECORDS: &str = r#"
    CREATE TABLE IF NOT EXISTS clock_records (
        id             TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        clock_in_at    TEXT NOT NULL,
        clock_in_lat   REAL NOT NULL,
        clock_in_long  REAL NOT NULL,
        clock_in_note  TEXT,
        clock_out_at   TEXT,
        clock_out_lat  REAL,
        clock_out_long REAL,
        clock_out_note TEXT,
        CHECK(clock_out_at IS NULL OR clock_out_at >= clock_in_at)
    );

    CREATE UNIQUE INDEX IF NOT EXISTS ux_clock_records_open
        ON clock_records(user_id) WHERE clock_out_at IS NULL;
    CREATE INDEX IF NOT EXISTS idx_clock_records_user_in ON clock_records(user_id, clock_in_at);
    CREATE INDEX IF NOT EXISTS idx_clock_records_in ON clock_records(clock_in_at);
"#;

/// Ordered list of schema migrations: (version, description, sql).
const MIGRATIONS: &[(&str, &str, &str)] = &[
    ("20250301_0001_create_users", "Created users table", CREATE_USERS),
    (
        "20250301_0002_create_perimeters",
        "Created perimeters table",
        CREATE_PERIMETERS,
    ),
    (
        "20250301_0003_create_clock_records",
        "Created clock_records table with one-open-record-per-user index",
        CREATE_CLOCK_RECORDS,
    ),
];

/// Public entry point: run all pending migrations.
///
/// Invoked by db::init_db().
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    // 1) Ensure log table
    ensure_log_table(conn)?;

    // 2) Apply each pending migration atomically
    for (version, message, sql) in MIGRATIONS {
        if is_applied(conn, version)? {
            continue;
        }

        conn.execute_batch("BEGIN;")?;
        let applied = conn
            .execute_batch(sql)
            .and_then(|_| mark_applied(conn, version, message));

        match applied {
            Ok(()) => {
                conn.execute_batch("COMMIT;")?;
                success(format!("Migration applied: {version}"));
            }
            Err(e) => {
                conn.execute_batch("ROLLBACK;")?;
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Versions already recorded in the ledger, in application order.
pub fn applied_versions(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT target FROM log WHERE operation = 'migration_applied' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();
        run_pending_migrations(&conn).unwrap();

        let versions = applied_versions(&conn).unwrap();
        assert_eq!(versions.len(), MIGRATIONS.len());
    }

    #[test]
    fn open_record_index_rejects_second_open_session() {
        let conn = Connection::open_in_memory().unwrap();
        run_pending_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (id, email, name, created_at) VALUES ('u1', 'a@b.c', 'A', '2025-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO clock_records (id, user_id, clock_in_at, clock_in_lat, clock_in_long)
                      VALUES (?1, 'u1', '2025-01-01T09:00:00.000Z', 0, 0)";
        conn.execute(insert, ["r1"]).unwrap();
        assert!(conn.execute(insert, ["r2"]).is_err());

        conn.execute(
            "UPDATE clock_records SET clock_out_at = '2025-01-01T17:00:00.000Z' WHERE id = 'r1'",
            [],
        )
        .unwrap();
        conn.execute(insert, ["r3"]).unwrap();
    }
}
