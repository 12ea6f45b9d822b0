//! Process-wide query cache

use super::entry::{CacheEntry, QueryStatus};
use super::key::QueryKey;
use crate::api::ApiError;
use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, trace};

type FetchFuture = BoxFuture<'static, Result<Value, ApiError>>;
type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;
type Listener = Arc<dyn Fn(Option<&CacheEntry>) + Send + Sync>;

/// A named query: its key, freshness window and the function that loads it
#[derive(Clone)]
pub struct QueryDef {
    pub key: QueryKey,
    pub stale_after: Option<Duration>,
    fetcher: Fetcher,
}

impl QueryDef {
    pub fn new<F, Fut>(key: QueryKey, stale_after: Option<Duration>, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        Self {
            key,
            stale_after,
            fetcher: Arc::new(move || fetcher().boxed()),
        }
    }
}

impl fmt::Debug for QueryDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDef")
            .field("key", &self.key)
            .field("stale_after", &self.stale_after)
            .finish_non_exhaustive()
    }
}

struct InFlight {
    generation: u64,
    future: Shared<FetchFuture>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    listeners: HashMap<QueryKey, Vec<(u64, Listener)>>,
    defs: HashMap<QueryKey, QueryDef>,
    in_flight: HashMap<QueryKey, InFlight>,
    /// Keys with a background refetch queued since their last write
    refetch_queued: HashSet<QueryKey>,
    /// Bumped by `cancel`; fetch results from older generations are dropped
    generations: HashMap<QueryKey, u64>,
}

impl CacheState {
    fn generation(&self, key: &QueryKey) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    fn listeners_for(&self, key: &QueryKey) -> Vec<Listener> {
        self.listeners
            .get(key)
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }
}

/// Keyed store of query results shared by every component of a dashboard.
///
/// All state sits behind one mutex that is held only for the duration of a
/// single read or write, so every write is atomic with respect to readers.
/// Subscriber callbacks run after the lock is released, in write order for
/// any single task.
pub struct QueryCache {
    state: Mutex<CacheState>,
    default_stale_after: Option<Duration>,
    next_listener: AtomicU64,
    weak_self: Weak<QueryCache>,
}

impl QueryCache {
    /// Create a cache whose unregistered keys use `default_stale_after`
    pub fn new(default_stale_after: Option<Duration>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(CacheState::default()),
            default_stale_after,
            next_listener: AtomicU64::new(1),
            weak_self: weak_self.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panicking listener never runs under the lock, so poisoning only
        // follows a panic inside this module; the state is still coherent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(listeners: Vec<Listener>, entry: Option<&CacheEntry>) {
        for listener in listeners {
            listener(entry);
        }
    }

    fn stale_after_for(&self, state: &CacheState, key: &QueryKey) -> Option<Duration> {
        state
            .defs
            .get(key)
            .map(|def| def.stale_after)
            .unwrap_or(self.default_stale_after)
    }

    /// Current snapshot of `key`
    pub fn read(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    /// Cached data of `key`, if any
    pub fn data(&self, key: &QueryKey) -> Option<Value> {
        self.lock().entries.get(key).and_then(|e| e.data.clone())
    }

    /// Replace or create the entry for `key` and notify its subscribers.
    ///
    /// A `Success` write counts as server-confirmed: it stamps `fetched_at`
    /// and clears the invalidated flag.
    pub fn write(&self, key: &QueryKey, data: Value, status: QueryStatus) {
        self.update(key, status, |_| Some(data));
    }

    /// Atomically compute the new data of `key` from its current data.
    ///
    /// Returning `None` leaves the entry untouched and notifies nobody.
    /// Returns whether a write happened.
    pub fn update<F>(&self, key: &QueryKey, status: QueryStatus, patch: F) -> bool
    where
        F: FnOnce(Option<&Value>) -> Option<Value>,
    {
        let (listeners, entry) = {
            let mut state = self.lock();
            let current = state.entries.get(key).and_then(|e| e.data.as_ref());
            let Some(data) = patch(current) else {
                return false;
            };
            let entry = self.store(&mut state, key, data, status);
            (state.listeners_for(key), entry)
        };

        trace!("write {} ({:?})", key, entry.status);
        Self::notify(listeners, Some(&entry));
        true
    }

    fn store(
        &self,
        state: &mut CacheState,
        key: &QueryKey,
        data: Value,
        status: QueryStatus,
    ) -> CacheEntry {
        let stale_after = self.stale_after_for(state, key);
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::empty(stale_after));
        entry.data = Some(data);
        entry.status = status;
        if status == QueryStatus::Success {
            entry.fetched_at = Some(Utc::now());
            entry.invalidated = false;
            entry.error = None;
        }
        let entry = entry.clone();
        state.refetch_queued.remove(key);
        entry
    }

    /// Put back a previously read entry in a single write.
    ///
    /// `None` removes the entry, restoring an absent key.
    pub fn restore(&self, key: &QueryKey, snapshot: Option<CacheEntry>) {
        let listeners = {
            let mut state = self.lock();
            match &snapshot {
                Some(entry) => {
                    state.entries.insert(key.clone(), entry.clone());
                }
                None => {
                    state.entries.remove(key);
                }
            }
            state.refetch_queued.remove(key);
            state.listeners_for(key)
        };

        debug!("restored {}", key);
        Self::notify(listeners, snapshot.as_ref());
    }

    /// Drop the entry for `key`
    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        let (listeners, removed) = {
            let mut state = self.lock();
            let removed = state.entries.remove(key);
            state.refetch_queued.remove(key);
            (state.listeners_for(key), removed)
        };

        if removed.is_some() {
            Self::notify(listeners, None);
        }
        removed
    }

    /// Drop every entry and abandon every in-flight fetch.
    ///
    /// Subscriptions and registered queries survive.
    pub fn clear(&self) {
        let notifications: Vec<Vec<Listener>> = {
            let mut state = self.lock();
            let fetching: Vec<QueryKey> = state.in_flight.keys().cloned().collect();
            for key in fetching {
                *state.generations.entry(key).or_insert(0) += 1;
            }
            state.in_flight.clear();
            let keys: Vec<QueryKey> = state.entries.keys().cloned().collect();
            state.entries.clear();
            state.refetch_queued.clear();
            keys.iter().map(|k| state.listeners_for(k)).collect()
        };

        for listeners in notifications {
            Self::notify(listeners, None);
        }
    }

    /// Keys currently holding an entry
    pub fn keys(&self) -> Vec<QueryKey> {
        self.lock().entries.keys().cloned().collect()
    }

    /// Mark every entry under `prefix` stale.
    ///
    /// Matching keys that have a subscriber and a registered query get one
    /// background refetch. Repeated calls before the next write to a key do
    /// not queue another. Returns the number of refetches queued.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let runtime = tokio::runtime::Handle::try_current().ok();
        let queued: Vec<QueryDef> = {
            let mut state = self.lock();
            for (key, entry) in state.entries.iter_mut() {
                if key.starts_with(prefix) {
                    entry.invalidated = true;
                }
            }

            let candidates: Vec<QueryKey> = state
                .listeners
                .iter()
                .filter(|(key, list)| key.starts_with(prefix) && !list.is_empty())
                .map(|(key, _)| key.clone())
                .collect();

            if runtime.is_none() {
                if !candidates.is_empty() {
                    debug!("no runtime available, skipping background refetch");
                }
                return 0;
            }

            let mut queued = Vec::new();
            for key in candidates {
                if state.refetch_queued.contains(&key) || state.in_flight.contains_key(&key) {
                    continue;
                }
                if let Some(def) = state.defs.get(&key).cloned() {
                    state.refetch_queued.insert(key);
                    queued.push(def);
                }
            }
            queued
        };

        debug!("invalidated {} ({} refetch queued)", prefix, queued.len());
        if queued.is_empty() {
            return 0;
        }

        let Some(runtime) = runtime else {
            return 0;
        };

        let count = queued.len();
        for def in queued {
            let Some(cache) = self.weak_self.upgrade() else {
                break;
            };
            runtime.spawn(async move {
                if let Err(e) = cache.start_fetch(&def).await {
                    debug!("background refetch of {} failed: {}", def.key, e);
                }
            });
        }
        count
    }

    /// Abandon in-flight fetches under `prefix`; their results are discarded
    pub fn cancel(&self, prefix: &QueryKey) {
        let mut state = self.lock();
        let keys: Vec<QueryKey> = state
            .in_flight
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in keys {
            state.in_flight.remove(&key);
            state.refetch_queued.remove(&key);
            *state.generations.entry(key.clone()).or_insert(0) += 1;
            debug!("cancelled fetch of {}", key);
        }
    }

    /// Whether a fetch for `key` is running
    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    /// Remember how to load `def.key` so invalidation can refetch it
    pub fn register(&self, def: QueryDef) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(&def.key) {
            entry.stale_after = def.stale_after;
        }
        state.defs.insert(def.key.clone(), def);
    }

    /// Return fresh cached data for `def`, loading it when missing or stale.
    ///
    /// Concurrent callers for the same key share a single request.
    pub async fn fetch(&self, def: &QueryDef) -> Result<Value, ApiError> {
        self.register(def.clone());

        if let Some(entry) = self.read(&def.key) {
            if entry.status == QueryStatus::Success && !entry.is_stale() {
                if let Some(data) = entry.data {
                    trace!("cache hit {}", def.key);
                    return Ok(data);
                }
            }
        }

        self.start_fetch(def).await
    }

    async fn start_fetch(&self, def: &QueryDef) -> Result<Value, ApiError> {
        let (future, first_load) = {
            let mut state = self.lock();
            let joined = state.in_flight.get(&def.key).map(|f| f.future.clone());
            match joined {
                Some(future) => (future, None),
                None => {
                    let generation = state.generation(&def.key);
                    let future = self.fetch_task(def, generation);
                    state.in_flight.insert(
                        def.key.clone(),
                        InFlight {
                            generation,
                            future: future.clone(),
                        },
                    );

                    let stale_after = self.stale_after_for(&state, &def.key);
                    let first_load = if state.entries.contains_key(&def.key) {
                        None
                    } else {
                        let entry = CacheEntry::empty(stale_after);
                        state.entries.insert(def.key.clone(), entry.clone());
                        Some((state.listeners_for(&def.key), entry))
                    };
                    (future, first_load)
                }
            }
        };

        if let Some((listeners, entry)) = first_load {
            Self::notify(listeners, Some(&entry));
        }

        debug!("fetching {}", def.key);
        future.await
    }

    fn fetch_task(&self, def: &QueryDef, generation: u64) -> Shared<FetchFuture> {
        let load = (def.fetcher)();
        let cache = self.weak_self.clone();
        let key = def.key.clone();

        let task: FetchFuture = async move {
            let result = load.await;
            if let Some(cache) = cache.upgrade() {
                cache.finish_fetch(&key, generation, &result);
            }
            result
        }
        .boxed();
        task.shared()
    }

    /// Store a fetch result unless the fetch was cancelled meanwhile.
    ///
    /// The generation check and the write share one lock acquisition.
    fn finish_fetch(&self, key: &QueryKey, generation: u64, result: &Result<Value, ApiError>) {
        let (listeners, entry) = {
            let mut state = self.lock();
            if state.generation(key) != generation {
                debug!("discarding cancelled fetch of {}", key);
                return;
            }
            if state
                .in_flight
                .get(key)
                .is_some_and(|f| f.generation == generation)
            {
                state.in_flight.remove(key);
            }

            let entry = match result {
                Ok(data) => self.store(&mut state, key, data.clone(), QueryStatus::Success),
                Err(e) => {
                    let stale_after = self.stale_after_for(&state, key);
                    Self::fail(&mut state, stale_after, key, e)
                }
            };
            (state.listeners_for(key), entry)
        };

        trace!("fetched {} ({:?})", key, entry.status);
        Self::notify(listeners, Some(&entry));
    }

    /// Record a failed load, keeping the previous data
    fn fail(
        state: &mut CacheState,
        stale_after: Option<Duration>,
        key: &QueryKey,
        error: &ApiError,
    ) -> CacheEntry {
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::empty(stale_after));
        entry.status = QueryStatus::Error;
        entry.error = Some(error.to_string());
        let entry = entry.clone();
        state.refetch_queued.remove(key);
        entry
    }

    /// Register `callback` for changes to `key`.
    ///
    /// The callback receives the new entry, or `None` when the entry is
    /// removed. Dropping the returned handle unsubscribes.
    pub fn subscribe<F>(&self, key: QueryKey, callback: F) -> Subscription
    where
        F: Fn(Option<&CacheEntry>) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .listeners
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(callback)));

        trace!("subscribed {} to {}", id, key);
        Subscription {
            cache: self.weak_self.clone(),
            key,
            id,
        }
    }

    fn unsubscribe(&self, key: &QueryKey, id: u64) {
        let mut state = self.lock();
        if let Some(list) = state.listeners.get_mut(key) {
            list.retain(|(listener_id, _)| *listener_id != id);
            if list.is_empty() {
                state.listeners.remove(key);
            }
        }
        trace!("unsubscribed {} from {}", id, key);
    }

    /// Number of live subscriptions on `key`
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.lock().listeners.get(key).map_or(0, Vec::len)
    }
}

/// Handle returned by [`QueryCache::subscribe`]; unsubscribes on drop
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cache: Weak<QueryCache>,
    key: QueryKey,
    id: u64,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.unsubscribe(&self.key, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
