use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::export::ExportLogic;
use crate::utils::path::expand_tilde_string;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Export {
        format,
        file,
        range,
        force,
    } = cmd
    {
        let pool = DbPool::new(&cfg.database)?;
        ExportLogic::export(
            &pool,
            *format,
            &expand_tilde_string(file),
            range.as_deref(),
            *force,
        )?;
    }
    Ok(())
}
