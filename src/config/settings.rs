//! Process settings loaded from environment variables.

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;

/// Default request body cap: 2 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Path of the table config JSON.
    pub tables_config: PathBuf,
    /// Directory holding `<table>.json` files for file-backed tables.
    pub data_dir: PathBuf,
    /// Required only when a relational table is configured.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tables_config: PathBuf::from("tables.json"),
            data_dir: PathBuf::from("data"),
            database_url: None,
            db_max_connections: 5,
            bind_addr: "0.0.0.0:3000".into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    /// Load settings from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        Ok(Settings {
            tables_config: env::var("TABLES_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.tables_config),
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| ConfigError::Validation(format!("invalid {} value '{}'", name, v))),
        Err(_) => Ok(default),
    }
}
