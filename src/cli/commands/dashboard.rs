use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::report::ReportLogic;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::AppResult;
use crate::ui::messages::{header, info};
use crate::utils::colors::{RESET, color_for_hours};
use crate::utils::formatting::hours2readable;
use crate::utils::table::Table;
use chrono::Utc;
use std::collections::HashMap;

/// Above this many hours in a single day average, highlight the row.
const LONG_SHIFT_HOURS: f64 = 10.0;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Dashboard { days, from, to } = cmd {
        let pool = DbPool::new(&cfg.database)?;

        let dash = ReportLogic::dashboard_unchecked(
            &pool.conn,
            days.as_deref(),
            from.as_deref(),
            to.as_deref(),
            Utc::now(),
        )?;

        header(format!(
            "Dashboard {} → {}",
            dash.range.from.format("%Y-%m-%d %H:%M"),
            dash.range.to.format("%Y-%m-%d %H:%M")
        ));

        if dash.avg_hours_per_day.is_empty() {
            info("No clock records in this window.");
            return Ok(());
        }

        let mut days_table = Table::new(["Date", "Avg hours", "People"]);
        for d in &dash.avg_hours_per_day {
            days_table.add_row(vec![
                d.date.clone(),
                format!(
                    "{}{}{RESET}",
                    color_for_hours(d.avg_hours, LONG_SHIFT_HOURS),
                    hours2readable(d.avg_hours)
                ),
                d.people_count.to_string(),
            ]);
        }
        print!("{}", days_table.render());
        println!();

        let emails: HashMap<String, String> = queries::list_users(&pool.conn)?
            .into_iter()
            .map(|u| (u.id, u.email))
            .collect();

        let mut staff_table = Table::new(["Staff", "Hours", "Total"]);
        for t in &dash.total_hours_per_staff_last_week {
            staff_table.add_row(vec![
                emails.get(&t.user_id).cloned().unwrap_or_else(|| t.user_id.clone()),
                format!("{:.2}", t.hours),
                hours2readable(t.hours),
            ]);
        }
        print!("{}", staff_table.render());
    }

    Ok(())
}
