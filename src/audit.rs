//! Audit trail of writes made through Placeboard
//!
//! Appends one JSON object per line to `<state_dir>/audit.log`. Only
//! outcomes are recorded: tokens and passwords never reach the file.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based audit logger that appends JSON lines
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config) -> Self {
        Self::at(ConfigManager::audit_log_path(), config.general.audit_log)
    }

    pub fn at(path: PathBuf, enabled: bool) -> Self {
        Self { enabled, path }
    }

    /// Logger that records nothing
    pub fn disabled() -> Self {
        Self::at(PathBuf::new(), false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed or failed mutation
    pub async fn mutation(&self, name: &str, result: Result<&Value, &str>, details: Value) {
        let (event, data) = match result {
            Ok(record) => (
                format!("{}.confirmed", name),
                json!({"id": record.get("id"), "details": details}),
            ),
            Err(message) => (
                format!("{}.rolled_back", name),
                json!({"error": message, "details": details}),
            ),
        };
        self.log(&event, &data).await;
    }

    /// Log an audit event as a JSON line.
    ///
    /// IO failures are logged and otherwise ignored.
    pub async fn log(&self, event: &str, data: &Value) {
        if !self.enabled {
            return;
        }

        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lines(audit: &AuditLog) -> Vec<Value> {
        std::fs::read_to_string(audit.path())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn confirmed_mutation_records_server_id() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::at(dir.path().join("audit.log"), true);

        audit
            .mutation(
                "create_place",
                Ok(&json!({"id": "42", "name": "Casbah"})),
                json!({"images": 1}),
            )
            .await;

        let entries = lines(&audit);
        assert_eq!(entries[0]["event"], "create_place.confirmed");
        assert_eq!(entries[0]["data"]["id"], "42");
        assert!(entries[0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn rollback_and_plain_events_append() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::at(dir.path().join("logs").join("audit.log"), true);

        audit
            .mutation("delete_place", Err("not found"), json!({"id": "7"}))
            .await;
        audit.log("auth.logout", &json!({})).await;

        let entries = lines(&audit);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["event"], "delete_place.rolled_back");
        assert_eq!(entries[0]["data"]["error"], "not found");
        assert_eq!(entries[1]["event"], "auth.logout");
    }

    #[tokio::test]
    async fn skips_when_disabled() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::at(dir.path().join("audit.log"), false);

        audit.log("should.not.appear", &json!({})).await;

        assert!(!audit.path().exists());
    }
}
