//! Signed upload credentials

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Seconds before `expire` from which a credential is no longer used
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Short-lived authorization to upload to the storage service.
///
/// Obtained from `GET /images` for every batch and never persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredential {
    pub token: String,
    /// Unix seconds
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
}

impl UploadCredential {
    /// Decode a credential from a bare body or from an envelope's `data`
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(mut map) if map.contains_key("data") && !map.contains_key("token") => {
                serde_json::from_value(map.remove("data").unwrap_or(Value::Null))
            }
            other => serde_json::from_value(other),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expire, 0).single()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expire - EXPIRY_BUFFER_SECS
    }

    /// Check if the credential is expired or about to expire
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for UploadCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCredential")
            .field("token", &"<redacted>")
            .field("expire", &self.expire)
            .field("signature", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}
