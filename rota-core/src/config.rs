//! Configuration management for Rota
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (ROTA_*)
//! 3. Config file (~/.config/rota/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use rota_db::DatabaseConfig;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Database-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file
    pub path: PathBuf,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// How long a writer waits for the database lock
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            path: defaults.path,
            max_connections: defaults.max_connections,
            busy_timeout: defaults.busy_timeout,
        }
    }
}

impl DatabaseSettings {
    /// Connection settings for the storage layer
    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.path)
            .with_max_connections(self.max_connections)
            .with_busy_timeout(self.busy_timeout)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Assignment engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline for a single engine operation, transaction included
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// How many reviewers a new pull request gets when enough are eligible
    pub reviewers_per_pull_request: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(5),
            reviewers_per_pull_request: 2,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseSettings,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Assignment engine configuration
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/rota/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rota").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - ROTA_DATABASE_PATH: Path to the SQLite database
    /// - ROTA_LISTEN: Address for the HTTP server
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("ROTA_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Ok(listen) = std::env::var("ROTA_LISTEN") {
            self.server.listen = listen;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, database: Option<PathBuf>, listen: Option<String>) -> Self {
        if let Some(path) = database {
            self.database.path = path;
        }

        if let Some(listen) = listen {
            self.server.listen = listen;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(database: Option<PathBuf>, listen: Option<String>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(database, listen))
    }
}
