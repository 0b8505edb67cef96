use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::auth::AuthLogic;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::role::Role;
use crate::ui::messages::{info, success};
use crate::utils::colors::{RESET, color_for_role};
use crate::utils::table::Table;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::User { list, email, role } = cmd {
        let pool = DbPool::new(&cfg.database)?;

        if let (Some(email), Some(role)) = (email, role) {
            let role = Role::from_code(role).ok_or_else(|| AppError::InvalidRole(role.clone()))?;
            let user = AuthLogic::assign_role(&pool.conn, email, role)?;
            success(format!("{} is now {}", user.email, user.role.to_db_str()));
        }

        if *list {
            let users = queries::list_users(&pool.conn)?;
            if users.is_empty() {
                info("No users registered yet.");
                return Ok(());
            }

            let mut table = Table::new(["Email", "Name", "Role", "Provider", "Created"]);
            for u in &users {
                let role = u.role.to_db_str();
                table.add_row(vec![
                    u.email.clone(),
                    u.name.clone(),
                    format!("{}{role}{RESET}", color_for_role(role)),
                    u.provider.to_db_str().to_string(),
                    u.created_at.format("%Y-%m-%d").to_string(),
                ]);
            }
            print!("{}", table.render());
        }
    }

    Ok(())
}
