//! Named dashboard queries
//!
//! | Key | Endpoint | Stale after |
//! |-----|----------|-------------|
//! | `["user"]` | `GET /auth/me` | never |
//! | `["places"]` | `GET /places` | `cache.places_stale_secs` |
//! | `["places", id]` | `GET /places/{id}` | `cache.places_stale_secs` |
//! | `["users"]` | `GET /users` | `cache.users_stale_secs` |
//! | `["users", id]` | `GET /users/{id}` | never |
//! | `["stats"]` | `GET /stats` | `cache.stats_stale_secs` |

use crate::api::{ApiClient, ApiError};
use crate::config::CacheConfig;
use crate::query::{QueryDef, QueryKey};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Cache keys of the dashboard's queries
pub mod keys {
    use crate::query::QueryKey;
    use crate::query_key;

    pub fn current_user() -> QueryKey {
        query_key!["user"]
    }

    pub fn places() -> QueryKey {
        query_key!["places"]
    }

    pub fn place(id: &str) -> QueryKey {
        query_key!["places", id]
    }

    pub fn users() -> QueryKey {
        query_key!["users"]
    }

    pub fn user(id: &str) -> QueryKey {
        query_key!["users", id]
    }

    pub fn stats() -> QueryKey {
        query_key!["stats"]
    }
}

/// Builds [`QueryDef`]s bound to one API client
#[derive(Clone)]
pub struct Queries {
    api: Arc<ApiClient>,
    places_stale: Option<Duration>,
    users_stale: Option<Duration>,
    stats_stale: Option<Duration>,
}

fn window(secs: u64) -> Option<Duration> {
    Some(Duration::from_secs(secs))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

impl Queries {
    pub fn new(api: Arc<ApiClient>, config: &CacheConfig) -> Self {
        Self {
            api,
            places_stale: window(config.places_stale_secs),
            users_stale: window(config.users_stale_secs),
            stats_stale: window(config.stats_stale_secs),
        }
    }

    fn def<F, Fut, T>(&self, key: QueryKey, stale_after: Option<Duration>, load: F) -> QueryDef
    where
        F: Fn(Arc<ApiClient>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let api = self.api.clone();
        QueryDef::new(key, stale_after, move || {
            let loaded = load(api.clone());
            async move { to_value(loaded.await?) }
        })
    }

    pub fn current_user(&self) -> QueryDef {
        self.def(keys::current_user(), None, |api| async move { api.me().await })
    }

    pub fn places(&self) -> QueryDef {
        self.def(keys::places(), self.places_stale, |api| async move {
            api.places().await
        })
    }

    pub fn place(&self, id: &str) -> QueryDef {
        let id = id.to_string();
        self.def(keys::place(&id), self.places_stale, move |api| {
            let id = id.clone();
            async move { api.place(&id).await }
        })
    }

    pub fn users(&self) -> QueryDef {
        self.def(keys::users(), self.users_stale, |api| async move {
            api.users().await
        })
    }

    pub fn user(&self, id: &str) -> QueryDef {
        let id = id.to_string();
        self.def(keys::user(&id), None, move |api| {
            let id = id.clone();
            async move { api.user(&id).await }
        })
    }

    pub fn stats(&self) -> QueryDef {
        self.def(keys::stats(), self.stats_stale, |api| async move {
            api.stats().await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::query::QueryCache;
    use crate::test_support::{envelope, place_json, ScriptedTransport};
    use serde_json::json;

    fn queries(transport: Arc<ScriptedTransport>) -> Queries {
        Queries::new(Arc::new(ApiClient::new(transport)), &CacheConfig::default())
    }

    #[test]
    fn keys_are_structural() {
        assert_eq!(keys::place("7").to_string(), r#"["places", "7"]"#);
        assert!(keys::place("7").starts_with(&keys::places()));
        assert!(!keys::users().starts_with(&keys::places()));
    }

    #[test]
    fn staleness_windows() {
        let q = queries(ScriptedTransport::new());
        assert_eq!(q.places().stale_after, Some(Duration::from_secs(300)));
        assert_eq!(q.stats().stale_after, Some(Duration::from_secs(300)));
        assert_eq!(q.current_user().stale_after, None);
        assert_eq!(q.user("u1").stale_after, None);
    }

    #[tokio::test]
    async fn place_detail_fetches_by_id() {
        let transport = ScriptedTransport::new();
        let mut detail = place_json("7", "Timgad");
        detail["createdBy"] = crate::test_support::user_json("u1");
        transport.reply(Method::Get, "/places/7", 200, envelope(detail));
        let cache = QueryCache::new(None);

        let data = cache.fetch(&queries(transport.clone()).place("7")).await.unwrap();
        assert_eq!(data["createdBy"]["id"], "u1");
        assert_eq!(transport.count(Method::Get, "/places/7"), 1);
        assert!(cache.read(&keys::place("7")).is_some());
    }

    #[tokio::test]
    async fn typed_fetch_normalizes_records() {
        let transport = ScriptedTransport::new();
        transport.reply(Method::Get, "/stats", 200, envelope(json!({"places": 4, "users": 2, "extra": true})));
        let cache = QueryCache::new(None);

        let data = cache.fetch(&queries(transport).stats()).await.unwrap();
        assert_eq!(data, json!({"places": 4, "users": 2}));
    }
}
