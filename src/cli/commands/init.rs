use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::initialize::init_db;
use crate::db::log::audit;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file, with a fresh JWT secret
///  - the SQLite database and all pending migrations
pub fn handle(cli: &Cli) -> AppResult<()> {
    //
    // 1️⃣ CONFIGURATION
    //
    let cfg = Config::init_all(cli.db.clone(), cli.test)?;

    info("Initializing staffclock…");

    //
    // 2️⃣ DATABASE (tables + migrations)
    //
    let pool = DbPool::new(&cfg.database)?;
    init_db(&pool.conn)?;

    success(format!("Database initialized at {}", cfg.database));

    //
    // 3️⃣ AUDIT (non blocking)
    //
    if let Err(e) = audit(
        &pool.conn,
        "init",
        &cfg.database,
        &format!("Database initialized at {}", cfg.database),
    ) {
        warning(format!("Failed to write internal log: {e}"));
    }

    success("staffclock initialization completed!");
    Ok(())
}
