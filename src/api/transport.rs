//! HTTP transport abstraction

use super::ApiError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Method, target resource and payload of one API call
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`
    pub path: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// Raw HTTP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request. `bearer` is the auth token, if any.
    async fn send(
        &self,
        request: RequestDescriptor,
        bearer: Option<String>,
    ) -> Result<HttpReply, ApiError>;
}

/// Transport backed by a blocking `ureq` agent
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl UreqTransport {
    /// Create a transport for `base_url` with a global request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(
        &self,
        request: RequestDescriptor,
        bearer: Option<String>,
    ) -> Result<HttpReply, ApiError> {
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method, url);

        // ureq blocks; keep it off the async workers
        tokio::task::spawn_blocking(move || call_blocking(&agent, &url, &request, bearer))
            .await
            .map_err(|e| ApiError::Transport(format!("request task failed: {}", e)))?
    }
}

fn call_blocking(
    agent: &ureq::Agent,
    url: &str,
    request: &RequestDescriptor,
    bearer: Option<String>,
) -> Result<HttpReply, ApiError> {
    let auth = bearer.map(|token| format!("Bearer {}", token));
    let body = match &request.body {
        Some(value) => serde_json::to_string(value).map_err(|e| ApiError::Decode(e.to_string()))?,
        None => String::new(),
    };

    let result = match request.method {
        Method::Get => with_auth(agent.get(url), auth.as_deref()).call(),
        Method::Delete => with_auth(agent.delete(url), auth.as_deref()).call(),
        Method::Post => with_auth(agent.post(url), auth.as_deref())
            .header("Content-Type", "application/json")
            .send(body.as_str()),
        Method::Put => with_auth(agent.put(url), auth.as_deref())
            .header("Content-Type", "application/json")
            .send(body.as_str()),
    };

    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ApiError::Transport(format!("reading response body: {}", e)))?;

    debug!("{} {} -> {}", request.method, url, status);
    Ok(HttpReply { status, body })
}

fn with_auth<B>(builder: ureq::RequestBuilder<B>, auth: Option<&str>) -> ureq::RequestBuilder<B> {
    match auth {
        Some(value) => builder.header("Authorization", value),
        None => builder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_constructors() {
        let req = RequestDescriptor::put("/places/7", json!({"name": "Casbah"}));
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.path, "/places/7");
        assert!(req.body.is_some());

        let req = RequestDescriptor::delete("/places/7");
        assert_eq!(req.method, Method::Delete);
        assert!(req.body.is_none());
    }

    #[test]
    fn method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let transport = UreqTransport::new("http://localhost:3000/api/", Duration::from_secs(5));
        assert_eq!(transport.base_url(), "http://localhost:3000/api");
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let transport = UreqTransport::new("http://127.0.0.1:1", Duration::from_secs(2));
        let err = transport
            .send(RequestDescriptor::get("/places"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn reply_success_range() {
        let ok = HttpReply {
            status: 204,
            body: String::new(),
        };
        let err = HttpReply {
            status: 404,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }
}
