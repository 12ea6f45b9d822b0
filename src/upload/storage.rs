//! Storage backends

use super::credential::UploadCredential;
use super::UploadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// File to upload, held in memory
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, named after its last path component
    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            UploadError::InvalidRequest(format!("reading {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 of the content, hex encoded
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Where an uploaded file ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub url: String,
    pub file_id: String,
}

/// Third-party file storage
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload one file with an unexpired credential.
    ///
    /// Dropping the returned future must stop the transfer.
    async fn upload(
        &self,
        file: &UploadFile,
        credential: &UploadCredential,
    ) -> Result<AssetRef, UploadError>;
}

/// ImageKit upload API
#[derive(Clone)]
pub struct ImageKitStorage {
    agent: ureq::Agent,
    endpoint: String,
}

impl ImageKitStorage {
    pub const DEFAULT_ENDPOINT: &'static str = "https://upload.imagekit.io/api/v1/files/upload";

    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StorageBackend for ImageKitStorage {
    async fn upload(
        &self,
        file: &UploadFile,
        credential: &UploadCredential,
    ) -> Result<AssetRef, UploadError> {
        let boundary = format!("placeboard-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, file, credential);
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let name = file.name().to_string();

        // The blocking transfer outlives this future unless told to stop
        let cancelled = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(cancelled.clone());

        tokio::task::spawn_blocking(move || {
            post_blocking(&agent, &endpoint, &boundary, &body, &name, &cancelled)
        })
        .await
        .map_err(|e| UploadError::Network(format!("upload task failed: {}", e)))?
    }
}

/// Raises the cancel flag of a blocking transfer when dropped
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Request body that fails the next read once the upload is cancelled
struct CancellableBody<'a> {
    remaining: &'a [u8],
    cancelled: &'a AtomicBool,
}

impl CancellableBody<'_> {
    const CHUNK: usize = 16 * 1024;
}

impl Read for CancellableBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(io::Error::other("upload aborted"));
        }
        let n = buf.len().min(self.remaining.len()).min(Self::CHUNK);
        buf[..n].copy_from_slice(&self.remaining[..n]);
        self.remaining = &self.remaining[n..];
        Ok(n)
    }
}

fn post_blocking(
    agent: &ureq::Agent,
    endpoint: &str,
    boundary: &str,
    body: &[u8],
    name: &str,
    cancelled: &AtomicBool,
) -> Result<AssetRef, UploadError> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(UploadError::Aborted);
    }

    debug!("uploading {} ({} bytes) to {}", name, body.len(), endpoint);
    let mut reader = CancellableBody {
        remaining: body,
        cancelled,
    };
    let sent = agent
        .post(endpoint)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header("Content-Length", body.len().to_string())
        .send(ureq::SendBody::from_reader(&mut reader));

    let mut response = match sent {
        Ok(response) => response,
        Err(_) if cancelled.load(Ordering::SeqCst) => {
            debug!("upload of {} stopped mid-transfer", name);
            return Err(UploadError::Aborted);
        }
        Err(e) => return Err(UploadError::Network(e.to_string())),
    };

    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| UploadError::Network(format!("reading upload response: {}", e)))?;

    let outcome = classify(status, &text);
    if let (Ok(asset), true) = (&outcome, cancelled.load(Ordering::SeqCst)) {
        // The body was fully sent before the abort; storage kept the file
        warn!(
            "upload of {} completed after abort, orphaned asset {} ({})",
            name, asset.file_id, asset.url
        );
    }
    outcome
}

/// Map a storage reply onto an asset or an upload error class
fn classify(status: u16, body: &str) -> Result<AssetRef, UploadError> {
    let message = || {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| format!("HTTP {}", status))
    };

    match status {
        200..=299 => serde_json::from_str(body)
            .map_err(|e| UploadError::Server(format!("unexpected upload response: {}", e))),
        400..=499 => Err(UploadError::InvalidRequest(message())),
        _ => Err(UploadError::Server(message())),
    }
}

/// A file name safe to embed in a part header
fn header_safe(name: &str) -> String {
    name.chars().filter(|c| *c != '"' && !c.is_control()).collect()
}

fn multipart_body(boundary: &str, file: &UploadFile, credential: &UploadCredential) -> Vec<u8> {
    let expire = credential.expire.to_string();
    let file_name = header_safe(file.name());
    let fields = [
        ("fileName", file_name.as_str()),
        ("publicKey", credential.public_key.as_str()),
        ("signature", credential.signature.as_str()),
        ("expire", expire.as_str()),
        ("token", credential.token.as_str()),
    ];

    let mut body = Vec::with_capacity(file.len() + 1024);
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            boundary, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(file.bytes());
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
