use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::migrate::run_pending_migrations;
use crate::db::pool::DbPool;
use crate::db::stats;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, RED, RESET};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        vacuum,
        info,
    } = cmd
    {
        if !(*migrate || *check || *vacuum || *info) {
            return Ok(());
        }

        let pool = DbPool::new(&cfg.database)?;

        //
        // 1) MIGRATE
        //
        if *migrate {
            println!("{CYAN}▶ Running migrations…{RESET}");
            run_pending_migrations(&pool.conn)?;
            println!("{GREEN}✔ Migration completed.{RESET}\n");
        }

        //
        // 2) INFO
        //
        if *info {
            stats::print_db_info(&pool, &cfg.database)?;
        }

        //
        // 3) CHECK
        //
        if *check {
            println!("{CYAN}▶ Running integrity check…{RESET}");

            let integrity: String = pool
                .conn
                .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

            if integrity == "ok" {
                println!("{GREEN}✔ Integrity check passed.{RESET}\n");
            } else {
                println!("{RED}✘ Integrity check failed:{RESET} {integrity}\n");
            }
        }

        //
        // 4) VACUUM
        //
        if *vacuum {
            println!("{CYAN}▶ Running VACUUM…{RESET}");
            pool.conn.execute_batch("VACUUM;")?;
            println!("{GREEN}✔ Vacuum completed.{RESET}\n");
        }
    }

    Ok(())
}
