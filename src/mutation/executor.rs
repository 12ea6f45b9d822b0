//! Single-write executor

use crate::api::{ApiClient, ApiError, RequestDescriptor};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Status of the executor's most recent call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// Performs exactly one network write per call.
///
/// Failures are returned to the caller as is: there is no retry, and the
/// query cache is never touched here.
pub struct MutationExecutor {
    api: Arc<ApiClient>,
    status: watch::Sender<MutationStatus>,
}

impl MutationExecutor {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self { api, status }
    }

    /// Run one write and return the server's `data`
    pub async fn execute(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        debug!("executing {} {}", request.method, request.path);
        self.status.send_replace(MutationStatus::Pending);

        let result = self.api.send(request).await;

        self.status.send_replace(match result {
            Ok(_) => MutationStatus::Success,
            Err(_) => MutationStatus::Error,
        });
        result
    }

    pub fn status(&self) -> MutationStatus {
        *self.status.borrow()
    }

    /// Receiver that observes every status change
    pub fn watch_status(&self) -> watch::Receiver<MutationStatus> {
        self.status.subscribe()
    }
}
