use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{error, header, success, warning};
use std::process::Command;

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

fn default_editor() -> String {
    std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(target_os = "windows") {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        })
}

fn run_editor(editor: &str, path: &std::path::Path) -> bool {
    matches!(Command::new(editor).arg(path).status(), Ok(s) if s.success())
}

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        edit_config,
        editor,
    } = cmd
    {
        let path = Config::config_file();

        // ---- PRINT CONFIG (secrets masked) ----
        if *print_config {
            let shown = Config {
                jwt_secret: mask(&cfg.jwt_secret),
                google_client_secret: cfg.google_client_secret.as_deref().map(mask),
                ..cfg.clone()
            };
            let yaml = serde_yaml::to_string(&shown)
                .map_err(|e| AppError::Config(format!("Failed to serialize configuration: {e}")))?;

            header("Current configuration");
            println!("{yaml}");
        }

        // ---- EDIT CONFIG ----
        if *edit_config {
            let fallback = default_editor();
            let requested = editor.clone().unwrap_or_else(|| fallback.clone());

            if run_editor(&requested, &path) {
                success(format!("Configuration file edited using '{requested}'"));
            } else if requested != fallback {
                warning(format!(
                    "Editor '{requested}' not available, falling back to '{fallback}'"
                ));
                if run_editor(&fallback, &path) {
                    success(format!("Configuration file edited using '{fallback}'"));
                } else {
                    error(format!("Failed to edit configuration file using '{fallback}'"));
                }
            } else {
                error(format!("Failed to edit configuration file using '{requested}'"));
            }
        }
    }

    Ok(())
}
