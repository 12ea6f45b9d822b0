//! Persisted auth token
//!
//! The token issued by login or registration is kept in a single JSON file
//! under the state directory, readable by the owner only.

use crate::config::ConfigManager;
use crate::error::{PlaceboardError, PlaceboardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Stored token entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Bearer token sent with every API request
    pub token: String,

    /// When the token was stored
    pub saved_at: DateTime<Utc>,

    /// Account the token was issued to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl StoredToken {
    pub fn new(token: String, email: Option<String>) -> Self {
        Self {
            token,
            saved_at: Utc::now(),
            email,
        }
    }
}

/// File-backed token store
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Store at the default location in the state directory
    pub fn new() -> Self {
        Self::with_path(ConfigManager::token_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token, if any
    pub async fn load(&self) -> PlaceboardResult<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            PlaceboardError::io(format!("reading token file {}", self.path.display()), e)
        })?;

        match serde_json::from_str(&content) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                debug!("Ignoring unreadable token file: {}", e);
                Ok(None)
            }
        }
    }

    /// Persist a token, replacing any previous one
    pub async fn save(&self, stored: &StoredToken) -> PlaceboardResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                PlaceboardError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }

        let content = serde_json::to_string_pretty(stored)?;
        fs::write(&self.path, content).await.map_err(|e| {
            PlaceboardError::io(format!("writing token file {}", self.path.display()), e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| PlaceboardError::io("setting token file permissions", e))?;
        }

        debug!("Stored token at {}", self.path.display());
        Ok(())
    }

    /// Remove the stored token. Returns whether one existed.
    pub async fn clear(&self) -> PlaceboardResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).await.map_err(|e| {
            PlaceboardError::io(format!("removing token file {}", self.path.display()), e)
        })?;
        debug!("Removed token at {}", self.path.display());
        Ok(true)
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> TokenStore {
        TokenStore::with_path(dir.path().join("state").join("token"))
    }

    #[tokio::test]
    async fn save_load_clear() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        assert!(store.load().await.unwrap().is_none());

        let stored = StoredToken::new("t0k".into(), Some("amel@example.com".into()));
        store.save(&stored).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(stored));

        assert!(store.clear().await.unwrap());
        assert!(!store.clear().await.unwrap());
        assert!(store.load().await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store
            .save(&StoredToken::new("t0k".into(), None))
            .await
            .unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn garbage_file_reads_as_logged_out() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(store.load().await.unwrap().is_none());
    }
}
