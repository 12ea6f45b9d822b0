//! Cache entries

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Outcome of the last write to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// First fetch in flight, or an optimistic value awaiting confirmation
    Pending,
    Success,
    Error,
}

/// Last known state of one query key
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Option<Value>,
    pub status: QueryStatus,
    /// When the data was last confirmed by the server
    pub fetched_at: Option<DateTime<Utc>>,
    /// Freshness window; `None` never goes stale on its own
    pub stale_after: Option<Duration>,
    /// Set by `invalidate`, cleared by the next confirmed write
    pub invalidated: bool,
    /// Message of the last failed fetch
    pub error: Option<String>,
}

impl CacheEntry {
    pub(crate) fn empty(stale_after: Option<Duration>) -> Self {
        Self {
            data: None,
            status: QueryStatus::Pending,
            fetched_at: None,
            stale_after,
            invalidated: false,
            error: None,
        }
    }

    /// Whether a refetch is warranted at `now`
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        if self.invalidated {
            return true;
        }
        let Some(fetched_at) = self.fetched_at else {
            return true;
        };
        match self.stale_after {
            None => false,
            Some(window) => {
                let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
                now.signed_duration_since(fetched_at) >= window
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// Deserialize the cached data
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data
            .as_ref()
            .map(|data| serde_json::from_value(data.clone()))
            .transpose()
    }
}
