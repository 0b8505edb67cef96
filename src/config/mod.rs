use crate::errors::{AppError, AppResult};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `STAFFCLOCK_JWT_SECRET`.
pub const ENV_PREFIX: &str = "STAFFCLOCK_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// HS256 signing secret. Must be set before `serve`.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Public base URL, used to build the OAuth redirect URI.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default)]
    pub google_client_secret: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_token_ttl_hours() -> i64 {
    72
}
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            bind_address: default_bind_address(),
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            base_url: default_base_url(),
            google_client_id: None,
            google_client_secret: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("staffclock")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".staffclock")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("staffclock.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("staffclock.sqlite")
    }

    /// Load defaults, then the YAML file (if any), then `STAFFCLOCK_*` env vars.
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Google OAuth credentials, when both halves are configured.
    pub fn google_credentials(&self) -> Option<(&str, &str)> {
        match (&self.google_client_id, &self.google_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }

    /// Fail fast on settings the server cannot run without.
    pub fn validate_for_server(&self) -> AppResult<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(AppError::Config(format!(
                "jwt_secret is not set: run `staffclock init` or export {ENV_PREFIX}JWT_SECRET"
            )));
        }
        if self.token_ttl_hours <= 0 {
            return Err(AppError::Config(
                "token_ttl_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Initialize configuration and database files.
    /// Returns the configuration that was written (or would have been, in test mode).
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Config> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            jwt_secret: hex::encode(rand::random::<[u8; 32]>()),
            ..Config::default()
        };

        // Write config file
        if !is_test {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| AppError::Config(format!("Failed to serialize configuration: {e}")))?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
            println!("✅ Config file: {:?}", Self::config_file());
        }

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        println!("✅ Database:    {:?}", db_path);

        Ok(config)
    }
}
