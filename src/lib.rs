//! staffclock library root.
//! Exposes the HTTP API, the CLI parser, the high-level run() function and
//! the internal modules.

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod export;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use utils::path::expand_tilde_string;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Serve { .. } => cli::commands::serve::handle(&cli.command, cfg),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::User { .. } => cli::commands::user::handle(&cli.command, cfg),
        Commands::Perimeter { .. } => cli::commands::perimeter::handle(&cli.command, cfg),
        Commands::Dashboard { .. } => cli::commands::dashboard::handle(&cli.command, cfg),
        Commands::Export { .. } => cli::commands::export::handle(&cli.command, cfg),
        Commands::Backup { .. } => cli::commands::backup::handle(&cli.command, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    // 1️⃣ parse CLI
    let cli = Cli::parse();

    // 2️⃣ load config once (defaults → YAML file → env)
    let mut cfg = Config::load()?;

    // 3️⃣ command-line DB override
    if let Some(custom_db) = &cli.db {
        cfg.database = expand_tilde_string(custom_db);
    }

    dispatch(&cli, &cfg)
}
