//! Application context
//!
//! [`Dashboard`] owns one query cache, one API client and the services built
//! on them. It is created once per process (or per test) and passed down
//! explicitly; nothing in the crate reaches for global state.

use crate::api::{
    ApiClient, ApiError, LoginRequest, NewPlace, Place, PlaceDetail, PlaceUpdate,
    RegisterRequest, Stats, Transport, UreqTransport, User,
};
use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::{PlaceboardError, PlaceboardResult};
use crate::forms::{CreatePlaceForm, EditPlaceForm, ImageRules, LoginForm, PlaceFields, RegisterForm};
use crate::mutation::{CreatePlace, DeletePlace, MutationExecutor, OptimisticUpdate, Reconciler, UpdatePlace};
use crate::queries::{keys, Queries};
use crate::query::{QueryCache, QueryDef, QueryStatus};
use crate::session::{StoredToken, TokenStore};
use crate::upload::{ImageKitStorage, StorageBackend, UploadCoordinator, UploadFile, UploadObserver};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Collaborators a [`Dashboard`] is assembled from
pub struct Components {
    pub transport: Arc<dyn Transport>,
    pub storage: Arc<dyn StorageBackend>,
    pub tokens: TokenStore,
    pub audit: AuditLog,
}

/// Changes requested by `places edit`; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct PlaceEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub wilaya_code: Option<i64>,
    /// URLs of current images to drop
    pub drop_images: Vec<String>,
    pub new_images: Vec<UploadFile>,
}

pub struct Dashboard {
    config: Config,
    cache: Arc<QueryCache>,
    api: Arc<ApiClient>,
    queries: Queries,
    reconciler: Reconciler,
    uploader: UploadCoordinator,
    tokens: TokenStore,
    audit: AuditLog,
}

impl Dashboard {
    pub fn new(config: Config, components: Components) -> Self {
        let api = Arc::new(ApiClient::new(components.transport));
        let cache = QueryCache::new(Some(Duration::from_secs(config.cache.places_stale_secs)));
        let executor = Arc::new(MutationExecutor::new(api.clone()));

        Self {
            queries: Queries::new(api.clone(), &config.cache),
            reconciler: Reconciler::new(cache.clone(), executor),
            uploader: UploadCoordinator::new(api.clone(), components.storage),
            tokens: components.tokens,
            audit: components.audit,
            cache,
            api,
            config,
        }
    }

    /// Build the production dashboard and load the stored token
    pub async fn connect(config: Config) -> PlaceboardResult<Self> {
        let transport = UreqTransport::new(
            config.api.base_url.clone(),
            Duration::from_secs(config.api.timeout_secs),
        );
        let storage = ImageKitStorage::new(
            config.upload.endpoint.clone(),
            Duration::from_secs(config.upload.timeout_secs),
        );
        debug!(
            "API at {}, uploads to {}",
            transport.base_url(),
            storage.endpoint()
        );
        let audit = AuditLog::new(&config);

        let dashboard = Self::new(
            config,
            Components {
                transport: Arc::new(transport),
                storage: Arc::new(storage),
                tokens: TokenStore::new(),
                audit,
            },
        );
        dashboard.load_token().await?;
        Ok(dashboard)
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    /// Report image upload progress of create and edit to `observer`
    pub fn on_upload(&mut self, observer: UploadObserver) {
        self.uploader.set_observer(observer);
    }

    /// Hand the stored token, if any, to the API client
    pub async fn load_token(&self) -> PlaceboardResult<bool> {
        let stored = self.tokens.load().await?;
        let found = stored.is_some();
        self.api.set_token(stored.map(|s| s.token));
        Ok(found)
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.token().is_some()
    }

    async fn query<T: DeserializeOwned>(&self, def: QueryDef) -> PlaceboardResult<T> {
        let data = self.cache.fetch(&def).await?;
        serde_json::from_value(data).map_err(|e| PlaceboardError::InvalidResponse(e.to_string()))
    }

    /// The logged-in user.
    ///
    /// A token the API no longer accepts is removed.
    pub async fn current_user(&self) -> PlaceboardResult<User> {
        if !self.is_authenticated() {
            return Err(PlaceboardError::NotAuthenticated);
        }

        match self.cache.fetch(&self.queries.current_user()).await {
            Ok(data) => serde_json::from_value(data)
                .map_err(|e| PlaceboardError::InvalidResponse(e.to_string())),
            Err(e) if matches!(e, ApiError::Remote(_)) || e.is_unauthorized() => {
                warn!("Stored token rejected: {}", e);
                self.forget_session().await?;
                Err(PlaceboardError::SessionRejected(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn login(&self, form: LoginForm) -> PlaceboardResult<User> {
        form.validate()?;
        let payload = self
            .api
            .login(&LoginRequest {
                email: form.email.trim().to_string(),
                password: form.password,
            })
            .await?;

        self.start_session(payload.token, payload.user, form.email.trim())
            .await
    }

    pub async fn register(&self, form: RegisterForm) -> PlaceboardResult<User> {
        form.validate()?;
        let payload = self
            .api
            .register(&RegisterRequest {
                name: form.name.trim().to_string(),
                email: form.email.trim().to_string(),
                password: form.password,
            })
            .await?;

        self.start_session(payload.token, payload.user, form.email.trim())
            .await
    }

    async fn start_session(&self, token: String, user: Option<User>, email: &str) -> PlaceboardResult<User> {
        self.tokens
            .save(&StoredToken::new(token.clone(), Some(email.to_string())))
            .await?;
        self.api.set_token(Some(token));
        self.cache.clear();

        if let Some(user) = &user {
            self.cache.register(self.queries.current_user());
            self.cache
                .write(&keys::current_user(), serde_json::to_value(user)?, QueryStatus::Success);
        }
        let user = match user {
            Some(user) => user,
            None => self.current_user().await?,
        };

        self.audit
            .log("auth.login", &json!({"user_id": user.id, "email": user.email}))
            .await;
        info!("Logged in as {}", user.email);
        Ok(user)
    }

    /// Drop the stored token and every cached entry
    pub async fn logout(&self) -> PlaceboardResult<bool> {
        let had_token = self.forget_session().await?;
        self.audit.log("auth.logout", &json!({})).await;
        Ok(had_token)
    }

    async fn forget_session(&self) -> PlaceboardResult<bool> {
        self.api.set_token(None);
        self.cache.clear();
        self.tokens.clear().await
    }

    pub async fn places(&self) -> PlaceboardResult<Vec<Place>> {
        self.query(self.queries.places()).await
    }

    pub async fn place(&self, id: &str) -> PlaceboardResult<PlaceDetail> {
        self.query(self.queries.place(id)).await
    }

    pub async fn users(&self) -> PlaceboardResult<Vec<User>> {
        self.query(self.queries.users()).await
    }

    pub async fn user(&self, id: &str) -> PlaceboardResult<User> {
        self.query(self.queries.user(id)).await
    }

    pub async fn stats(&self) -> PlaceboardResult<Stats> {
        self.query(self.queries.stats()).await
    }

    fn image_rules(&self) -> ImageRules {
        ImageRules::from(&self.config.upload)
    }

    /// Upload `files` and keep the URLs of the ones that made it
    async fn upload_images(&self, files: &[UploadFile]) -> PlaceboardResult<Vec<String>> {
        let slots = self.uploader.upload_batch(files).await?;
        Ok(slots.into_iter().flatten().map(|asset| asset.url).collect())
    }

    /// Run a place mutation, record it, and decode the confirmed record
    async fn mutate<U: OptimisticUpdate>(&self, update: U, details: Value) -> PlaceboardResult<Value> {
        let name = update.name();
        match self.reconciler.run(update).await {
            Ok(record) => {
                self.audit.mutation(name, Ok(&record), details).await;
                Ok(record)
            }
            Err(e) => {
                let message = e.to_string();
                self.audit.mutation(name, Err(message.as_str()), details).await;
                Err(e.into())
            }
        }
    }

    /// Validate, upload the images, then create the place optimistically
    pub async fn create_place(&self, form: CreatePlaceForm) -> PlaceboardResult<Place> {
        let wilaya_code = form.validate(self.image_rules())?;
        let user = self.current_user().await?;

        let images = self.upload_images(&form.images).await?;
        if images.is_empty() {
            return Err(PlaceboardError::NoImagesUploaded);
        }
        if images.len() < form.images.len() {
            warn!("{} of {} image(s) failed to upload", form.images.len() - images.len(), form.images.len());
        }

        let digests: Vec<String> = form.images.iter().map(UploadFile::digest).collect();
        let new_place = NewPlace {
            name: form.fields.name,
            description: form.fields.description,
            wilaya_code,
            images,
            created_by_id: user.id,
        };

        let record = self
            .mutate(CreatePlace::new(new_place), json!({"image_digests": digests}))
            .await?;
        decode_record(record)
    }

    /// Apply `edit` to place `id`
    pub async fn edit_place(&self, id: &str, edit: PlaceEdit) -> PlaceboardResult<Place> {
        if !self.is_authenticated() {
            return Err(PlaceboardError::NotAuthenticated);
        }
        let current = self.place(id).await?.place;

        let form = EditPlaceForm {
            fields: PlaceFields {
                name: edit.name.unwrap_or(current.name),
                description: edit.description.unwrap_or(current.description),
                wilaya_code: edit.wilaya_code.unwrap_or(i64::from(current.wilaya_code)),
            },
            kept_images: current
                .images
                .into_iter()
                .filter(|url| !edit.drop_images.contains(url))
                .collect(),
            new_images: edit.new_images,
        };
        let wilaya_code = form.validate(self.image_rules())?;

        let uploaded = self.upload_images(&form.new_images).await?;
        let images = form.final_images(uploaded);
        debug!("place {} will carry {} image(s)", id, images.len());

        let update = PlaceUpdate {
            place_id: id.to_string(),
            name: form.fields.name,
            description: form.fields.description,
            wilaya_code,
            images,
            created_by_id: current.created_by_id,
        };
        let record = self
            .mutate(UpdatePlace::new(update), json!({"id": id, "dropped": edit.drop_images}))
            .await?;
        decode_record(record)
    }

    pub async fn delete_place(&self, id: &str) -> PlaceboardResult<()> {
        if !self.is_authenticated() {
            return Err(PlaceboardError::NotAuthenticated);
        }
        self.mutate(DeletePlace::new(id), json!({"id": id})).await?;
        Ok(())
    }
}

fn decode_record(record: Value) -> PlaceboardResult<Place> {
    serde_json::from_value(record).map_err(|e| PlaceboardError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::test_support::{
        credential_json, envelope, place_json, user_json, FakeStorage, ScriptedTransport,
    };
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        transport: Arc<ScriptedTransport>,
        storage: Arc<FakeStorage>,
        dashboard: Dashboard,
    }

    async fn harness(logged_in: bool) -> Harness {
        let dir = TempDir::new().unwrap();
        let tokens = TokenStore::with_path(dir.path().join("token"));
        if logged_in {
            tokens
                .save(&StoredToken::new("t0k".into(), None))
                .await
                .unwrap();
        }

        let transport = ScriptedTransport::new();
        transport.reply(
            Method::Get,
            "/auth/me",
            200,
            envelope(json!({"user": user_json("u1")})),
        );
        transport.reply(Method::Get, "/images", 200, credential_json());
        let storage = FakeStorage::new();

        let dashboard = Dashboard::new(
            Config::default(),
            Components {
                transport: transport.clone(),
                storage: storage.clone(),
                tokens,
                audit: AuditLog::at(dir.path().join("audit.log"), true),
            },
        );
        dashboard.load_token().await.unwrap();

        Harness {
            dir,
            transport,
            storage,
            dashboard,
        }
    }

    fn casbah_form(images: &[&str]) -> CreatePlaceForm {
        CreatePlaceForm {
            fields: PlaceFields {
                name: "Casbah".into(),
                description: "Old town".into(),
                wilaya_code: 16,
            },
            images: images
                .iter()
                .map(|n| UploadFile::new(*n, n.as_bytes().to_vec()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn create_uploads_then_posts() {
        let h = harness(true).await;
        h.transport.reply(Method::Post, "/places", 201, envelope(place_json("42", "Casbah")));

        let place = h
            .dashboard
            .create_place(casbah_form(&["casbah.jpg", "fail.jpg"]))
            .await
            .unwrap();
        assert_eq!(place.id, "42");

        let post = h
            .transport
            .calls()
            .into_iter()
            .find(|c| c.method == Method::Post)
            .unwrap();
        let body = post.body.unwrap();
        assert_eq!(body["createdById"], "u1");
        assert_eq!(body["images"], json!(["https://ik.example/tok-1/casbah.jpg"]));

        let audit = std::fs::read_to_string(h.dir.path().join("audit.log")).unwrap();
        assert!(audit.contains("create_place.confirmed"));
    }

    #[tokio::test]
    async fn create_without_any_upload_never_posts() {
        let h = harness(true).await;

        let err = h
            .dashboard
            .create_place(casbah_form(&["fail.jpg"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceboardError::NoImagesUploaded));
        assert_eq!(h.transport.count(Method::Post, "/places"), 0);
    }

    #[tokio::test]
    async fn invalid_form_touches_nothing() {
        let h = harness(true).await;
        let mut form = casbah_form(&["casbah.jpg"]);
        form.fields.wilaya_code = 99;

        assert!(h.dashboard.create_place(form).await.is_err());
        assert!(h.transport.calls().is_empty());
        assert!(h.storage.uploaded().is_empty());
    }

    #[tokio::test]
    async fn logged_out_create_is_rejected() {
        let h = harness(false).await;
        let err = h
            .dashboard
            .create_place(casbah_form(&["casbah.jpg"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaceboardError::NotAuthenticated));
    }

    #[tokio::test]
    async fn unreachable_api_keeps_token() {
        let dir = TempDir::new().unwrap();
        let tokens = TokenStore::with_path(dir.path().join("token"));
        tokens.save(&StoredToken::new("t0k".into(), None)).await.unwrap();

        let transport = ScriptedTransport::new();
        transport.fail(Method::Get, "/auth/me", ApiError::Transport("refused".into()));
        let dashboard = Dashboard::new(
            Config::default(),
            Components {
                transport: transport.clone(),
                storage: FakeStorage::new(),
                tokens: tokens.clone(),
                audit: AuditLog::disabled(),
            },
        );
        dashboard.load_token().await.unwrap();

        let err = dashboard.current_user().await.unwrap_err();
        assert!(matches!(err, PlaceboardError::Transport(_)));
        assert!(dashboard.is_authenticated());
        assert!(tokens.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remote_rejection_of_me_clears_token() {
        let dir = TempDir::new().unwrap();
        let tokens = TokenStore::with_path(dir.path().join("token"));
        tokens.save(&StoredToken::new("stale".into(), None)).await.unwrap();

        let transport = ScriptedTransport::new();
        transport.reply(
            Method::Get,
            "/auth/me",
            401,
            json!({"success": false, "error": "Unauthorized"}),
        );
        let dashboard = Dashboard::new(
            Config::default(),
            Components {
                transport: transport.clone(),
                storage: FakeStorage::new(),
                tokens: tokens.clone(),
                audit: AuditLog::disabled(),
            },
        );
        dashboard.load_token().await.unwrap();

        let err = dashboard.current_user().await.unwrap_err();
        assert!(matches!(err, PlaceboardError::SessionRejected(_)));
        assert!(!dashboard.is_authenticated());
        assert!(tokens.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_stores_token_and_user() {
        let h = harness(false).await;
        h.transport.reply(
            Method::Post,
            "/auth/login",
            200,
            envelope(json!({"token": "new-token", "user": user_json("u1")})),
        );

        let user = h
            .dashboard
            .login(LoginForm {
                email: "amel@example.com".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(h.dashboard.api().token().as_deref(), Some("new-token"));
        assert_eq!(h.dashboard.current_user().await.unwrap().id, "u1");
        assert_eq!(h.transport.count(Method::Get, "/auth/me"), 0);
    }

    #[tokio::test]
    async fn register_fetches_user_with_new_token() {
        let h = harness(false).await;
        h.transport.reply(
            Method::Post,
            "/auth/register",
            201,
            envelope(json!({"token": "fresh"})),
        );

        let user = h
            .dashboard
            .register(RegisterForm {
                name: "Amel".into(),
                email: "amel@example.com".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(h.transport.bearers().last().unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn logout_clears_token_and_cache() {
        let h = harness(true).await;
        h.transport.reply(Method::Get, "/places", 200, envelope(json!([place_json("1", "Tipaza")])));
        h.dashboard.places().await.unwrap();

        assert!(h.dashboard.logout().await.unwrap());
        assert!(!h.dashboard.is_authenticated());
        assert!(h.dashboard.cache().keys().is_empty());
        assert!(!h.dashboard.logout().await.unwrap());
    }

    #[tokio::test]
    async fn delete_not_found_keeps_list() {
        let h = harness(true).await;
        h.transport.reply(
            Method::Get,
            "/places",
            200,
            envelope(json!([place_json("7", "Timgad")])),
        );
        h.transport.reply(
            Method::Delete,
            "/places/7",
            404,
            json!({"success": false, "error": "not found"}),
        );
        h.dashboard.places().await.unwrap();

        let err = h.dashboard.delete_place("7").await.unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert_eq!(h.dashboard.places().await.unwrap()[0].id, "7");
    }

    #[tokio::test]
    async fn edit_keeps_undropped_images() {
        let h = harness(true).await;
        let mut detail = place_json("3", "Tipaza");
        detail["images"] = json!(["https://ik.example/a.jpg", "https://ik.example/b.jpg"]);
        detail["createdBy"] = user_json("u1");
        h.transport.reply(Method::Get, "/places/3", 200, envelope(detail));
        h.transport.reply(Method::Put, "/places/3", 200, envelope(place_json("3", "Tipaza")));

        h.dashboard
            .edit_place(
                "3",
                PlaceEdit {
                    description: Some("Roman ruins".into()),
                    drop_images: vec!["https://ik.example/a.jpg".into()],
                    new_images: vec![UploadFile::new("c.jpg", vec![1, 2, 3])],
                    ..PlaceEdit::default()
                },
            )
            .await
            .unwrap();

        let put = h
            .transport
            .calls()
            .into_iter()
            .find(|c| c.method == Method::Put)
            .unwrap();
        let body = put.body.unwrap();
        assert_eq!(body["placeId"], "3");
        assert_eq!(body["name"], "Tipaza");
        assert_eq!(body["description"], "Roman ruins");
        assert_eq!(
            body["images"],
            json!(["https://ik.example/b.jpg", "https://ik.example/tok-1/c.jpg"])
        );
    }
}
