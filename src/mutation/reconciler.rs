//! Optimistic reconciliation of cache entries around a write
//!
//! One mutation moves through
//! `Idle -> Started -> (OptimisticApplied) -> Settling -> Confirmed | RolledBack`.
//! The prediction step is optional per key: a strategy that cannot safely
//! predict a key's value leaves it untouched until confirmation.

use super::executor::MutationExecutor;
use crate::api::{ApiError, RequestDescriptor};
use crate::query::{CacheEntry, QueryCache, QueryKey, QueryStatus};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How one kind of write changes the cache
pub trait OptimisticUpdate: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// The write to perform
    fn request(&self) -> RequestDescriptor;

    /// Keys whose entries this write changes
    fn keys(&self) -> Vec<QueryKey>;

    /// Predicted value of `key` before the server answers, or `None` when
    /// no safe prediction exists
    fn predict(&self, key: &QueryKey, current: Option<&Value>) -> Option<Value>;

    /// Value of `key` once the server returned `confirmed`, or `None` to keep
    /// the current value
    fn confirm(&self, key: &QueryKey, current: Option<&Value>, confirmed: &Value) -> Option<Value>;

    /// Prefixes to invalidate after confirmation so derived views refetch
    fn invalidates(&self) -> Vec<QueryKey> {
        self.keys()
    }

    /// Keys whose entries no longer make sense after confirmation
    fn evicts(&self) -> Vec<QueryKey> {
        Vec::new()
    }
}

/// Phase of a pending mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    Started,
    OptimisticApplied,
    Settling,
    Confirmed,
    RolledBack,
}

/// Entries of the affected keys as they were when the mutation started
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<(QueryKey, Option<CacheEntry>)>,
}

impl Snapshot {
    fn take(cache: &QueryCache, keys: &[QueryKey]) -> Self {
        Self {
            entries: keys.iter().map(|k| (k.clone(), cache.read(k))).collect(),
        }
    }

    /// Entry of `key` at snapshot time
    pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, entry)| entry.as_ref())
    }
}

/// One in-progress mutation and the cache state it must restore on failure
pub struct PendingMutation<U> {
    cache: Arc<QueryCache>,
    update: U,
    phase: MutationPhase,
    snapshot: Snapshot,
    /// Keys that received an optimistic value
    patched: Vec<QueryKey>,
}

impl<U: OptimisticUpdate> PendingMutation<U> {
    pub fn new(cache: Arc<QueryCache>, update: U) -> Self {
        Self {
            cache,
            update,
            phase: MutationPhase::Idle,
            snapshot: Snapshot::default(),
            patched: Vec::new(),
        }
    }

    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    pub fn update(&self) -> &U {
        &self.update
    }

    /// Record the affected entries and stop in-flight loads of them from
    /// overwriting what follows
    pub fn snapshot(&mut self) -> &Snapshot {
        let keys = self.update.keys();
        for key in &keys {
            self.cache.cancel(key);
        }
        self.snapshot = Snapshot::take(&self.cache, &keys);
        self.phase = MutationPhase::Started;
        debug!("{}: started, {} key(s) snapshotted", self.update.name(), keys.len());
        &self.snapshot
    }

    /// Write the predicted values as `pending`
    pub fn apply_optimistic(&mut self) {
        for key in self.update.keys() {
            let update = &self.update;
            let applied = self
                .cache
                .update(&key, QueryStatus::Pending, |current| update.predict(&key, current));
            if applied {
                self.patched.push(key);
            }
        }

        if !self.patched.is_empty() {
            self.phase = MutationPhase::OptimisticApplied;
        }
        debug!(
            "{}: optimistic value on {} key(s)",
            self.update.name(),
            self.patched.len()
        );
    }

    /// Mark the write as in flight
    pub fn begin_settling(&mut self) {
        self.phase = MutationPhase::Settling;
    }

    /// Fold the server's answer into the cache, or put the snapshot back
    pub fn commit_or_rollback(
        &mut self,
        outcome: Result<Value, ApiError>,
    ) -> Result<Value, ApiError> {
        match outcome {
            Ok(confirmed) => {
                self.commit(&confirmed);
                Ok(confirmed)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    fn commit(&mut self, confirmed: &Value) {
        for key in self.update.keys() {
            let update = &self.update;
            let was_patched = self.patched.contains(&key);
            self.cache.update(&key, QueryStatus::Success, |current| {
                update
                    .confirm(&key, current, confirmed)
                    .or_else(|| if was_patched { current.cloned() } else { None })
            });
        }
        for key in self.update.evicts() {
            self.cache.remove(&key);
        }
        for prefix in self.update.invalidates() {
            self.cache.invalidate(&prefix);
        }

        self.phase = MutationPhase::Confirmed;
        info!("{}: confirmed", self.update.name());
    }

    fn rollback(&mut self) {
        for key in &self.patched {
            let previous = self.snapshot.get(key).cloned();
            self.cache.restore(key, previous);
        }

        self.phase = MutationPhase::RolledBack;
        warn!(
            "{}: rolled back {} key(s)",
            self.update.name(),
            self.patched.len()
        );
    }
}

/// Runs writes with optimistic cache updates
pub struct Reconciler {
    cache: Arc<QueryCache>,
    executor: Arc<MutationExecutor>,
}

impl Reconciler {
    pub fn new(cache: Arc<QueryCache>, executor: Arc<MutationExecutor>) -> Self {
        Self { cache, executor }
    }

    pub fn executor(&self) -> &MutationExecutor {
        &self.executor
    }

    /// Run `update` to completion.
    ///
    /// On failure every patched key is back to its snapshot before the
    /// error is returned.
    pub async fn run<U: OptimisticUpdate>(&self, update: U) -> Result<Value, ApiError> {
        let mut pending = PendingMutation::new(self.cache.clone(), update);
        pending.snapshot();
        pending.apply_optimistic();

        let request = pending.update().request();
        pending.begin_settling();
        let outcome = self.executor.execute(request).await;

        pending.commit_or_rollback(outcome)
    }
}
