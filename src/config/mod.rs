//! Configuration management for Placeboard

pub mod schema;

pub use schema::{ApiConfig, CacheConfig, Config, GeneralConfig, UploadConfig};

use crate::error::{PlaceboardError, PlaceboardResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Overrides the state directory, mainly for tests and CI
pub const STATE_DIR_ENV: &str = "PLACEBOARD_STATE_DIR";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("placeboard")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("placeboard")
    }

    /// Get the stored auth token path
    pub fn token_path() -> PathBuf {
        Self::state_dir().join("token")
    }

    /// Get the audit log path
    pub fn audit_log_path() -> PathBuf {
        Self::state_dir().join("audit.log")
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> PlaceboardResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PlaceboardResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            PlaceboardError::io(format!("reading config from {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| PlaceboardError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PlaceboardResult<()> {
        let content = toml::to_string_pretty(config)?;
        self.write(&content).await?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Replace the config file with already-rendered TOML
    pub async fn write(&self, content: &str) -> PlaceboardResult<()> {
        self.ensure_config_dir().await?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PlaceboardError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })
    }

    /// Raw config file content, empty when the file does not exist
    pub async fn read_raw(&self) -> PlaceboardResult<String> {
        if !self.config_path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&self.config_path).await.map_err(|e| {
            PlaceboardError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> PlaceboardResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PlaceboardError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directory exists and is private to the user
    pub async fn ensure_state_dir() -> PlaceboardResult<PathBuf> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PlaceboardError::io(format!("creating directory {}", dir.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(&dir, perms)
                .map_err(|e| PlaceboardError::io("setting state dir permissions", e))?;
        }

        Ok(dir)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
