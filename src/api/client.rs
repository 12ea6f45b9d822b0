//! Typed client for the places API

use super::envelope::ApiResponse;
use super::transport::{RequestDescriptor, Transport};
use super::types::{
    AuthPayload, CurrentUser, LoginRequest, Place, PlaceDetail, RegisterRequest, Stats, User,
};
use super::ApiError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Client for the places API
///
/// Holds the bearer token used for every request. The token is swapped in
/// place on login and logout so clones of the surrounding `Arc` observe it.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Create a client without a token
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            token: RwLock::new(None),
        }
    }

    /// Create a client that authenticates with `token`
    pub fn with_token(transport: Arc<dyn Transport>, token: Option<String>) -> Self {
        Self {
            transport,
            token: RwLock::new(token),
        }
    }

    /// Replace the bearer token
    pub fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    /// Current bearer token
    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Send a request and decode its envelope, without interpreting the outcome
    pub async fn send_raw(&self, request: RequestDescriptor) -> Result<ApiResponse<Value>, ApiError> {
        let reply = self.transport.send(request, self.token()).await?;
        ApiResponse::from_reply(&reply)
    }

    /// Send a request and return the envelope's data, or the server error
    pub async fn send(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        self.send_raw(request).await?.into_result()
    }

    /// `GET` a path and deserialize the envelope's data
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_raw(RequestDescriptor::get(path))
            .await?
            .decode()?
            .into_result()
    }

    /// `GET /auth/me`
    pub async fn me(&self) -> Result<User, ApiError> {
        let current: CurrentUser = self.get("/auth/me").await?;
        Ok(current.user)
    }

    /// `POST /auth/login`
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        debug!("Logging in as {}", request.email);
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
        let data = self
            .send(RequestDescriptor::post("/auth/login", body))
            .await?;
        serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        debug!("Registering {}", request.email);
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
        let data = self
            .send(RequestDescriptor::post("/auth/register", body))
            .await?;
        serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `GET /places`
    pub async fn places(&self) -> Result<Vec<Place>, ApiError> {
        self.get("/places").await
    }

    /// `GET /places/{id}`
    pub async fn place(&self, id: &str) -> Result<PlaceDetail, ApiError> {
        self.get(&format!("/places/{}", id)).await
    }

    /// `GET /users`
    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/users").await
    }

    /// `GET /users/{id}`
    pub async fn user(&self, id: &str) -> Result<User, ApiError> {
        self.get(&format!("/users/{}", id)).await
    }

    /// `GET /stats`
    pub async fn stats(&self) -> Result<Stats, ApiError> {
        self.get("/stats").await
    }

    /// `GET` a path whose OK body may or may not be enveloped.
    ///
    /// Returns the envelope's data when the body is an envelope and the
    /// whole body otherwise. Failure envelopes and non-OK replies are errors.
    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let reply = self
            .transport
            .send(RequestDescriptor::get(path), self.token())
            .await?;

        if let Ok(envelope) = ApiResponse::from_reply(&reply) {
            return envelope.into_result();
        }
        if !reply.is_success() {
            return Err(ApiError::Status {
                status: reply.status,
                message: reply.body.trim().chars().take(200).collect(),
            });
        }
        serde_json::from_str(&reply.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::test_support::{place_json, user_json, ScriptedTransport};
    use serde_json::json;

    #[tokio::test]
    async fn places_decodes_list() {
        let transport = ScriptedTransport::new();
        transport.reply(
            Method::Get,
            "/places",
            200,
            json!({"success": true, "message": "", "data": [place_json("1", "Casbah")]}),
        );

        let client = ApiClient::new(transport.clone());
        let places = client.places().await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Casbah");
    }

    #[tokio::test]
    async fn failure_envelope_is_remote_error() {
        let transport = ScriptedTransport::new();
        transport.reply(
            Method::Get,
            "/places/9",
            404,
            json!({"success": false, "error": "not found"}),
        );

        let client = ApiClient::new(transport.clone());
        let err = client.place("9").await.unwrap_err();
        assert_eq!(err, ApiError::Remote("not found".to_string()));
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer() {
        let transport = ScriptedTransport::new();
        transport.reply(
            Method::Get,
            "/auth/me",
            200,
            json!({"success": true, "message": "", "data": {"user": user_json("u1")}}),
        );

        let client = ApiClient::with_token(transport.clone(), Some("secret".to_string()));
        let user = client.me().await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(transport.bearers(), vec![Some("secret".to_string())]);

        client.set_token(None);
        assert!(client.token().is_none());
    }

    #[tokio::test]
    async fn login_returns_token() {
        let transport = ScriptedTransport::new();
        transport.reply(
            Method::Post,
            "/auth/login",
            200,
            json!({"success": true, "message": "welcome", "data": {"token": "t0k", "user": user_json("u1")}}),
        );

        let client = ApiClient::new(transport.clone());
        let payload = client
            .login(&LoginRequest {
                email: "amel@example.com".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();

        assert_eq!(payload.token, "t0k");
        let call = &transport.calls()[0];
        assert_eq!(call.body.as_ref().unwrap()["email"], "amel@example.com");
    }

    #[tokio::test]
    async fn get_json_accepts_bare_and_enveloped_bodies() {
        let transport = ScriptedTransport::new();
        transport.reply(Method::Get, "/bare", 200, json!({"token": "a"}));
        transport.reply(
            Method::Get,
            "/wrapped",
            200,
            json!({"success": true, "message": "", "data": {"token": "b"}}),
        );
        transport.reply(Method::Get, "/denied", 401, json!({"message": "Unauthorized"}));

        let client = ApiClient::new(transport.clone());
        assert_eq!(client.get_json("/bare").await.unwrap()["token"], "a");
        assert_eq!(client.get_json("/wrapped").await.unwrap()["token"], "b");
        assert!(client.get_json("/denied").await.unwrap_err().is_unauthorized());
    }
}
