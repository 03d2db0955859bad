use crate::core::{Result, RowflowError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: ConnectInfo,
    pub streaming: Option<StreamingConfig>,
}

/// Backend coordinates supplied by the caller, never hardcoded.
///
/// For the embedded SQLite backend only `database` selects the target: a
/// file path, or `:memory:` for a private in-memory database. The remaining
/// fields are carried so the configuration shape survives a networked
/// backend swap.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectInfo {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

impl ConnectInfo {
    /// Coordinates for a private in-memory database, mainly for tests and
    /// demos.
    pub fn in_memory() -> Self {
        Self::with_database(":memory:")
    }

    /// Coordinates for a database file at the given path.
    pub fn with_database(database: impl Into<String>) -> Self {
        ConnectInfo {
            host: default_host(),
            port: default_port(),
            database: database.into(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Streaming and pagination knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    /// Rows buffered between the streaming worker and the consumer.
    pub fetch_chunk: Option<usize>,
    /// Default page size for batch streaming and offset pagination.
    pub page_size: Option<usize>,
}

/// Loads configuration from a TOML file at the given path.
///
/// # Errors
///
/// Returns `RowflowError::Config` if the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(&path).map_err(|e| {
        RowflowError::Config(format!(
            "failed to read {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    toml::from_str(&content).map_err(|e| RowflowError::Config(e.to_string()))
}

/// Default configuration file location under the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rowflow").join("config.toml"))
}
