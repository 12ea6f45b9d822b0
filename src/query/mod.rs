//! Query cache
//!
//! Maps structural [`QueryKey`]s to their last known result. Entries are
//! only changed through the cache's own API (`write`, `update`, `restore`,
//! `invalidate`); readers always get an owned snapshot.
//!
//! # Entry lifecycle
//!
//! | Status | Meaning |
//! |--------|---------|
//! | pending | First load in flight, or an optimistic value awaiting the server |
//! | success | Server-confirmed data, fresh until `stale_after` elapses |
//! | error | Last load failed; previous data (if any) is kept |
//!
//! `invalidate` marks entries stale and refetches the ones somebody is
//! subscribed to. Repeated invalidation before the next write queues at most
//! one refetch per key.

mod cache;
mod entry;
mod key;

pub use cache::{QueryCache, QueryDef, Subscription};
pub use entry::{CacheEntry, QueryStatus};
pub use key::{KeySegment, QueryKey};
