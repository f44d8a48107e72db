//! Operator configuration.
//!
//! Load order, later overriding earlier:
//! 1. Built-in defaults (SQLite file `ledger.db`, level from `RUST_LOG`)
//! 2. `ledger.toml` in the working directory, or the file given by `--config`
//! 3. `--backend` / `--db` flags
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "classroom.db"
//!
//! [logging]
//! level = "debug"
//! file = "ledger.log"
//! ```

use std::path::{Path, PathBuf};

use ledger_core::db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Any `EnvFilter` directive; overrides `RUST_LOG` when set.
    pub level: Option<String>,
    /// Append log records to this file in addition to stderr.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub database: DbConfig,
    pub logging: LoggingConfig,
}

impl LedgerConfig {
    /// Read the config file.
    ///
    /// An explicit `path` must exist. Without one, `ledger.toml` is used when
    /// present and the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply command-line flags on top of the file values.
    pub fn apply_overrides(
        &mut self,
        backend: Option<String>,
        connection_string: Option<String>,
    ) {
        if let Some(backend) = backend {
            self.database.backend = backend;
        }
        if let Some(connection_string) = connection_string {
            self.database.connection_string = connection_string;
        }
    }
}
