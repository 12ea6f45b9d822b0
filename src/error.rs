//! Error types for Placeboard
//!
//! All modules use `PlaceboardResult<T>` as their return type. The API and
//! upload layers keep their own narrower error enums and convert into
//! `PlaceboardError` at the workflow boundary.

use crate::api::ApiError;
use crate::upload::UploadError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Placeboard operations
pub type PlaceboardResult<T> = Result<T, PlaceboardError>;

/// All errors that can occur in Placeboard
#[derive(Error, Debug)]
pub enum PlaceboardError {
    // Remote API errors
    #[error("{0}")]
    Remote(String),

    #[error("API returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Could not reach the API: {0}")]
    Transport(String),

    #[error("Malformed API response: {0}")]
    InvalidResponse(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Session rejected by the API: {0}")]
    SessionRejected(String),

    // Upload errors
    #[error("Could not obtain upload credentials: {0}")]
    Auth(String),

    #[error("Upload of {file} failed: {source}")]
    Upload {
        file: String,
        #[source]
        source: UploadError,
    },

    #[error("No images could be uploaded")]
    NoImagesUploaded,

    // Input errors
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PlaceboardError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an error carrying the API's message verbatim
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Upload { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAuthenticated => Some("Run: placeboard login --email <email>"),
            Self::SessionRejected(_) => Some("Your session expired. Run: placeboard login"),
            Self::Transport(_) => Some("Check api.base_url with: placeboard config show"),
            Self::NoImagesUploaded => Some("Check upload.endpoint and retry the command"),
            Self::ConfigInvalid { .. } => Some("Reset with: placeboard config init --force"),
            Self::Auth(_) => Some("Log in again, then retry the upload"),
            _ => None,
        }
    }
}

impl From<ApiError> for PlaceboardError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Remote(message) => Self::remote(message),
            ApiError::Status { status, message } => Self::Http { status, message },
            ApiError::Transport(message) => Self::Transport(message),
            ApiError::Decode(message) => Self::InvalidResponse(message),
        }
    }
}
