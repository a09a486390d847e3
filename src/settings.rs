//! Settings for the database handle and the batch runner.
//!
//! Values come from an optional TOML file, overridden by `SQLKIT_*`
//! environment variables (`SQLKIT_DATABASE__PATH`, `SQLKIT_LOG_LEVEL`, ...).

use config::{Config, Environment, File};
use serde::Deserialize;

use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, in-memory when absent.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            foreign_keys: default_foreign_keys(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("SQLKIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

fn default_busy_timeout_ms() -> u64 {
    5000
}
fn default_foreign_keys() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
