//! Batch upload coordination

use super::credential::UploadCredential;
use super::storage::{AssetRef, StorageBackend, UploadFile};
use super::UploadError;
use crate::api::ApiClient;
use crate::error::{PlaceboardError, PlaceboardResult};
use futures_util::future::{self, AbortHandle, Abortable, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Uploads started by [`UploadCoordinator::upload_batch_abortable`]
pub struct AbortableBatch {
    /// One handle per file, in input order
    pub handles: Vec<AbortHandle>,
    /// Resolves to one slot per file once every upload settled
    pub uploads: BoxFuture<'static, Vec<Option<AssetRef>>>,
}

/// Progress reported while a batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEvent<'a> {
    /// A credential was obtained and `total` uploads are starting
    Started { total: usize },
    /// One upload settled
    Finished { name: &'a str, ok: bool },
}

/// Callback receiving [`UploadEvent`]s
pub type UploadObserver = Arc<dyn Fn(UploadEvent<'_>) + Send + Sync>;

/// Obtains upload credentials and drives the storage backend
pub struct UploadCoordinator {
    api: Arc<ApiClient>,
    storage: Arc<dyn StorageBackend>,
    observer: Option<UploadObserver>,
}

impl UploadCoordinator {
    pub fn new(api: Arc<ApiClient>, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            api,
            storage,
            observer: None,
        }
    }

    /// Report batch progress to `observer`
    pub fn set_observer(&mut self, observer: UploadObserver) {
        self.observer = Some(observer);
    }

    /// Ask the API for a fresh signed credential
    pub async fn request_credentials(&self) -> PlaceboardResult<UploadCredential> {
        let body = self
            .api
            .get_json("/images")
            .await
            .map_err(|e| PlaceboardError::Auth(e.to_string()))?;

        let credential = UploadCredential::from_value(body)
            .map_err(|e| PlaceboardError::InvalidResponse(format!("upload credential: {}", e)))?;
        debug!("upload credential valid until {:?}", credential.expires_at());
        Ok(credential)
    }

    /// Upload one file. An expired credential never reaches the network.
    pub async fn upload_one(
        &self,
        file: &UploadFile,
        credential: &UploadCredential,
    ) -> Result<AssetRef, UploadError> {
        upload_with(self.storage.as_ref(), file, credential).await
    }

    /// Upload every file concurrently with one fresh credential.
    ///
    /// The result has one slot per input file; failed uploads are `None`.
    pub async fn upload_batch(&self, files: &[UploadFile]) -> PlaceboardResult<Vec<Option<AssetRef>>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let credential = self.request_credentials().await?;
        notify(&self.observer, UploadEvent::Started { total: files.len() });

        let uploads = files.iter().map(|file| {
            let credential = &credential;
            async move {
                let slot = settle(file.name(), self.upload_one(file, credential).await);
                notify(
                    &self.observer,
                    UploadEvent::Finished {
                        name: file.name(),
                        ok: slot.is_some(),
                    },
                );
                slot
            }
        });
        let slots = future::join_all(uploads).await;

        report(&slots);
        Ok(slots)
    }

    /// Like [`upload_batch`](Self::upload_batch), but each upload can be
    /// aborted on its own through the returned handles
    pub async fn upload_batch_abortable(&self, files: Vec<UploadFile>) -> PlaceboardResult<AbortableBatch> {
        let credential = Arc::new(self.request_credentials().await?);
        notify(&self.observer, UploadEvent::Started { total: files.len() });

        let mut handles = Vec::with_capacity(files.len());
        let mut uploads = Vec::with_capacity(files.len());
        for file in files {
            let (handle, registration) = AbortHandle::new_pair();
            let storage = self.storage.clone();
            let credential = credential.clone();
            let label = file.name().to_string();

            let upload = async move { upload_with(storage.as_ref(), &file, &credential).await };
            let upload = Abortable::new(upload, registration)
                .map(|outcome| outcome.unwrap_or(Err(UploadError::Aborted)));

            handles.push(handle);
            uploads.push((upload, label));
        }

        let observer = self.observer.clone();
        let uploads = async move {
            let observer = &observer;
            let slots = future::join_all(uploads.into_iter().map(|(upload, label)| async move {
                let slot = settle(&label, upload.await);
                notify(
                    observer,
                    UploadEvent::Finished {
                        name: &label,
                        ok: slot.is_some(),
                    },
                );
                slot
            }))
            .await;
            report(&slots);
            slots
        }
        .boxed();

        Ok(AbortableBatch { handles, uploads })
    }
}

async fn upload_with(
    storage: &dyn StorageBackend,
    file: &UploadFile,
    credential: &UploadCredential,
) -> Result<AssetRef, UploadError> {
    if credential.is_expired() {
        return Err(UploadError::InvalidRequest(
            "upload credential expired".to_string(),
        ));
    }
    storage.upload(file, credential).await
}

fn settle(name: &str, result: Result<AssetRef, UploadError>) -> Option<AssetRef> {
    match result {
        Ok(asset) => {
            debug!("uploaded {} -> {}", name, asset.url);
            Some(asset)
        }
        Err(UploadError::Aborted) => {
            info!("upload of {} aborted", name);
            None
        }
        Err(e) => {
            warn!("upload of {} failed: {}", name, e);
            None
        }
    }
}

fn notify(observer: &Option<UploadObserver>, event: UploadEvent<'_>) {
    if let Some(observer) = observer {
        observer(event);
    }
}

fn report(slots: &[Option<AssetRef>]) {
    let done = slots.iter().filter(|s| s.is_some()).count();
    info!("uploaded {}/{} file(s)", done, slots.len());
}
