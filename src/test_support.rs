//! Scripted collaborators shared by unit tests

use crate::api::{ApiError, HttpReply, Method, RequestDescriptor, Transport};
use crate::upload::{AssetRef, StorageBackend, UploadCredential, UploadError, UploadFile};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Clone)]
struct Scripted {
    reply: Result<HttpReply, ApiError>,
    gate: Option<Arc<Notify>>,
}

/// Transport answering from per-route queues.
///
/// The last queued reply for a route is reused once the queue drains.
/// Unknown routes answer 404 with a failure envelope.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<(RequestDescriptor, Option<String>)>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub(crate) fn reply(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(
            method,
            path,
            Scripted {
                reply: Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
                gate: None,
            },
        );
    }

    /// Queue a reply that is held back until the returned gate is notified
    pub(crate) fn reply_gated(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: Value,
    ) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(
            method,
            path,
            Scripted {
                reply: Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
                gate: Some(gate.clone()),
            },
        );
        gate
    }

    pub(crate) fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.push(
            method,
            path,
            Scripted {
                reply: Err(error),
                gate: None,
            },
        );
    }

    pub(crate) fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(req, _)| req.clone())
            .collect()
    }

    pub(crate) fn bearers(&self) -> Vec<Option<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, bearer)| bearer.clone())
            .collect()
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(req, _)| req.method == method && req.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: RequestDescriptor,
        bearer: Option<String>,
    ) -> Result<HttpReply, ApiError> {
        let key = (request.method, request.path.clone());
        self.calls.lock().unwrap().push((request, bearer));

        let scripted = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        let Some(scripted) = scripted else {
            return Ok(HttpReply {
                status: 404,
                body: json!({"success": false, "error": "no route"}).to_string(),
            });
        };

        if let Some(gate) = scripted.gate {
            gate.notified().await;
        }
        scripted.reply
    }
}

/// Storage backend that fails files whose name starts with `fail`
#[derive(Default)]
pub(crate) struct FakeStorage {
    uploaded: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for FakeStorage {
    async fn upload(
        &self,
        file: &UploadFile,
        credential: &UploadCredential,
    ) -> Result<AssetRef, UploadError> {
        if file.name().starts_with("fail") {
            return Err(UploadError::Server("storage unavailable".to_string()));
        }
        self.uploaded.lock().unwrap().push(file.name().to_string());
        Ok(AssetRef {
            url: format!("https://ik.example/{}/{}", credential.token, file.name()),
            file_id: format!("file-{}", file.name()),
        })
    }
}

pub(crate) fn place_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "wilayaCode": 16,
        "images": [],
        "createdById": "u1",
        "userId": null,
        "createdAt": "2025-01-01T00:00:00Z",
        "updatedAt": "2025-01-01T00:00:00Z"
    })
}

pub(crate) fn user_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Amel",
        "email": "amel@example.com",
        "avatar": "",
        "role": "ADMIN",
        "createdAt": "2025-01-01T00:00:00Z",
        "updatedAt": "2025-01-01T00:00:00Z"
    })
}

pub(crate) fn envelope(data: Value) -> Value {
    json!({"success": true, "message": "", "data": data})
}

pub(crate) fn credential_json() -> Value {
    json!({
        "token": "tok-1",
        "expire": chrono::Utc::now().timestamp() + 1800,
        "signature": "sig",
        "publicKey": "public_key"
    })
}
