//! Image uploads to third-party storage
//!
//! A batch asks the API for a fresh signed [`UploadCredential`], then sends
//! every file to the storage backend concurrently. A file that fails is
//! logged and reported as `None` in its slot; the rest of the batch is
//! unaffected.

mod coordinator;
mod credential;
mod storage;

pub use coordinator::{AbortableBatch, UploadCoordinator, UploadEvent, UploadObserver};
pub use credential::UploadCredential;
pub use storage::{AssetRef, ImageKitStorage, StorageBackend, UploadFile};

use thiserror::Error;

/// Why a single file upload failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("upload aborted")]
    Aborted,

    /// Missing file, expired credential or a request the storage rejected
    #[error("invalid upload request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("storage server error: {0}")]
    Server(String),
}

impl UploadError {
    /// Whether the same upload could succeed with a new attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server(_))
    }
}
