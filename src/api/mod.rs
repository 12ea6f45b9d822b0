//! Remote places API
//!
//! Every endpoint answers with a JSON envelope that is either
//! `{"success": true, "message": ..., "data": ...}` or
//! `{"success": false, "error": ...}`. The envelope is decoded into
//! [`ApiResponse`] so that call sites must handle both arms.
//!
//! Network access goes through the [`Transport`] trait. The production
//! transport drives a blocking `ureq` agent from the tokio blocking pool;
//! tests plug in scripted transports.

pub mod client;
pub mod envelope;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use envelope::ApiResponse;
pub use transport::{HttpReply, Method, RequestDescriptor, Transport, UreqTransport};
pub use types::{
    AuthPayload, CurrentUser, LoginRequest, NewPlace, Place, PlaceDetail, PlaceUpdate,
    RegisterRequest, Stats, User, UserRole,
};

use thiserror::Error;

/// Errors produced while talking to the places API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The API answered `success: false`; the message is shown to the user as is
    #[error("{0}")]
    Remote(String),

    /// Non-OK status without a decodable envelope
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the API explicitly rejected the caller's credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}
