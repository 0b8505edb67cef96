use crate::db::pool::DbPool;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::OptionalExtension;
use std::fs;

fn count(pool: &DbPool, sql: &str) -> rusqlite::Result<i64> {
    pool.conn.query_row(sql, [], |row| row.get(0))
}

pub fn print_db_info(pool: &DbPool, db_path: &str) -> rusqlite::Result<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) ROW COUNTS
    //
    let users = count(pool, "SELECT COUNT(*) FROM users")?;
    let perimeters = count(pool, "SELECT COUNT(*) FROM perimeters")?;
    let records = count(pool, "SELECT COUNT(*) FROM clock_records")?;
    let open = count(
        pool,
        "SELECT COUNT(*) FROM clock_records WHERE clock_out_at IS NULL",
    )?;

    println!("{}• Users:{} {}{}{}", CYAN, RESET, GREEN, users, RESET);
    println!("{}• Perimeters:{} {}{}{}", CYAN, RESET, GREEN, perimeters, RESET);
    println!(
        "{}• Clock records:{} {}{}{} ({} on shift)",
        CYAN, RESET, GREEN, records, RESET, open
    );

    //
    // 3) DATE RANGE
    //
    let first: Option<String> = pool
        .conn
        .query_row(
            "SELECT clock_in_at FROM clock_records ORDER BY clock_in_at ASC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let last: Option<String> = pool
        .conn
        .query_row(
            "SELECT clock_in_at FROM clock_records ORDER BY clock_in_at DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let fmt = |v: Option<String>| v.unwrap_or_else(|| format!("{GREY}--{RESET}"));

    println!("{}• Clock-in range:{}", CYAN, RESET);
    println!("    from: {}", fmt(first));
    println!("    to:   {}", fmt(last));

    println!();
    Ok(())
}
