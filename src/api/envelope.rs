//! Response envelope decoding

use super::transport::HttpReply;
use super::ApiError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Longest slice of a non-JSON error body kept in an error message
const MAX_ERROR_BODY: usize = 200;

/// Decoded API envelope
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success { message: String, data: T },
    Failure { error: String },
}

/// Wire shape of the envelope before the `success` flag is resolved
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiResponse<Value> {
    /// Decode an HTTP reply into an envelope.
    ///
    /// A body that is not an envelope is reported as `Status` for non-OK
    /// replies and `Decode` otherwise.
    pub fn from_reply(reply: &HttpReply) -> Result<Self, ApiError> {
        match serde_json::from_str::<RawEnvelope>(&reply.body) {
            Ok(raw) if raw.success => {
                if !reply.is_success() {
                    return Err(ApiError::Status {
                        status: reply.status,
                        message: raw.message.unwrap_or_default(),
                    });
                }
                Ok(Self::Success {
                    message: raw.message.unwrap_or_default(),
                    data: raw.data.unwrap_or(Value::Null),
                })
            }
            Ok(raw) => Ok(Self::Failure {
                error: raw
                    .error
                    .or(raw.message)
                    .unwrap_or_else(|| format!("request failed with HTTP {}", reply.status)),
            }),
            Err(e) if reply.is_success() => Err(ApiError::Decode(e.to_string())),
            Err(_) => Err(ApiError::Status {
                status: reply.status,
                message: truncate(reply.body.trim()),
            }),
        }
    }

    /// Deserialize the success payload into a typed value
    pub fn decode<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, ApiError> {
        match self {
            Self::Success { message, data } => {
                let data =
                    serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(ApiResponse::Success { message, data })
            }
            Self::Failure { error } => Ok(ApiResponse::Failure { error }),
        }
    }
}

impl<T> ApiResponse<T> {
    /// Collapse the envelope into a `Result`, surfacing the server message verbatim
    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Self::Success { data, .. } => Ok(data),
            Self::Failure { error } => Err(ApiError::Remote(error)),
        }
    }

    /// Server message attached to a success envelope
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } => Some(message),
            Self::Failure { .. } => None,
        }
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
