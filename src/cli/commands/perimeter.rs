use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::geo::point_from_inputs;
use crate::core::perimeters::PerimeterLogic;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::AppResult;
use crate::ui::messages::{info, warning};
use crate::utils::colors::colorize_inside;
use crate::utils::formatting::meters2readable;
use crate::utils::table::Table;
use serde_json::Value;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Perimeter { list, lat, lon } = cmd {
        let pool = DbPool::new(&cfg.database)?;

        if *list {
            let perimeters = queries::load_all_perimeters(&pool.conn)?;
            if perimeters.is_empty() {
                info("No perimeters configured.");
            } else {
                let mut table = Table::new(["Name", "Location", "Latitude", "Longitude", "Radius"]);
                for p in &perimeters {
                    table.add_row(vec![
                        p.name.clone(),
                        p.location.clone(),
                        format!("{:.6}", p.latitude),
                        format!("{:.6}", p.longitude),
                        meters2readable(p.radius),
                    ]);
                }
                print!("{}", table.render());
            }
        }

        if let (Some(lat), Some(lon)) = (lat, lon) {
            let point = point_from_inputs(
                Some(&Value::String(lat.clone())),
                Some(&Value::String(lon.clone())),
            )?;
            let check = PerimeterLogic::check_within(&pool.conn, point)?;

            match check.nearest {
                Some(n) => println!(
                    "({:.6}, {:.6}) is {} {} (distance {}, radius {})",
                    point.latitude,
                    point.longitude,
                    colorize_inside(check.inside),
                    n.name,
                    meters2readable(n.distance_meters as f64),
                    meters2readable(n.radius_meters),
                ),
                None => warning("No perimeters configured."),
            }
        }
    }

    Ok(())
}
