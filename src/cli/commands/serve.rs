use crate::api::{self, AppState};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::initialize::init_db;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Already installed (e.g. a second serve in the same process) is fine.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Serve { bind } = cmd {
        let mut cfg = cfg.clone();
        if let Some(addr) = bind {
            cfg.bind_address = addr.clone();
        }
        cfg.validate_for_server()?;

        init_tracing(&cfg.log_level);

        let pool = DbPool::new(&cfg.database)?;
        init_db(&pool.conn)?;

        let bind_address = cfg.bind_address.clone();
        let state = AppState::new(pool, cfg);
        if state.oauth.is_none() {
            tracing::info!("Google sign-in disabled (no client credentials configured)");
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(AppError::from)?;

        runtime.block_on(api::serve(state, &bind_address))?;
    }

    Ok(())
}
