//! Store configuration
//!
//! Loaded from an optional config file and `BIGLEAGUE_*` environment
//! variables, after a `.env` file (if any) has been folded into the
//! environment.

use crate::errors::{config_error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `BIGLEAGUE_DATABASE_PATH`
pub const ENV_PREFIX: &str = "BIGLEAGUE";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: default_pool_size(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("bigleague.db")
}

fn default_pool_size() -> u32 {
    20
}

fn default_connection_timeout_ms() -> u64 {
    5_000
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl StoreConfig {
    /// Load configuration from file and environment
    ///
    /// With no explicit file, `bigleague.{toml,json,...}` in the working
    /// directory is used when present. An explicit file must exist.
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Config` when a source cannot be read or a
    /// value does not fit its field.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("bigleague").required(false),
        };

        config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<StoreConfig>())
            .map_err(config_error)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
