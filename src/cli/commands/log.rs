use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log::load_audit;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::{header, info};
use crate::utils::date::from_db_timestamp;
use ansi_term::Colour;

const MAX_TARGET: usize = 40;

fn color_for_operation(op: &str) -> Colour {
    match op {
        "clock_in" => Colour::Green,
        "clock_out" => Colour::Red,
        "perimeter_add" | "perimeter_update" | "perimeter_del" => Colour::Yellow,
        "register" | "role" => Colour::Cyan,
        "migration_applied" => Colour::Purple,
        "backup" => Colour::Blue,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max - 3).collect();
        t.push_str("...");
        t
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if matches!(cmd, Commands::Log { print: true }) {
        let pool = DbPool::new(&cfg.database)?;
        let entries = load_audit(&pool.conn)?;

        if entries.is_empty() {
            info("The internal log is empty.");
            return Ok(());
        }

        header("Internal log");

        let id_w = entries.iter().map(|e| e.id.to_string().len()).max().unwrap_or(1);
        let op_w = entries.iter().map(|e| e.operation.len()).max().unwrap_or(1);

        for e in &entries {
            let date = from_db_timestamp(&e.date)
                .map(|d| d.format("%F %T").to_string())
                .unwrap_or_else(|| e.date.clone());
            let op = format!("{:<op_w$}", e.operation);

            println!(
                "{:>id_w$}: {} | {} {:<tw$} => {}",
                e.id,
                date,
                color_for_operation(&e.operation).paint(op),
                truncate(&e.target, MAX_TARGET),
                e.message,
                tw = MAX_TARGET,
            );
        }
    }

    Ok(())
}
