//! Configuration schema for Placeboard
//!
//! Configuration is stored at `~/.config/placeboard/config.toml`

use crate::upload::ImageKitStorage;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Places API settings
    pub api: ApiConfig,

    /// Query cache freshness
    pub cache: CacheConfig,

    /// Image upload settings
    pub upload: UploadConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record mutations in the audit log
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Places API connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Timeout for a whole request, in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// How long fetched data stays fresh, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub places_stale_secs: u64,
    pub users_stale_secs: u64,
    pub stats_stale_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            places_stale_secs: 300,
            users_stale_secs: 300,
            stats_stale_secs: 300,
        }
    }
}

/// Image upload settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Storage upload endpoint
    pub endpoint: String,

    /// Most images a place may carry
    pub max_images: usize,

    /// Largest accepted image, in bytes
    pub max_image_bytes: u64,

    /// Timeout for a single file upload, in seconds
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: ImageKitStorage::DEFAULT_ENDPOINT.to_string(),
            max_images: 2,
            max_image_bytes: 1024 * 1024,
            timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://places.example/api"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://places.example/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.upload.max_images, 2);
        assert!(config.general.audit_log);
    }

    #[test]
    fn default_serializes_every_section() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        for section in ["[general]", "[api]", "[cache]", "[upload]"] {
            assert!(text.contains(section), "missing {}", section);
        }
    }
}
