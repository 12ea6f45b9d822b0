//! Writes against the places API
//!
//! [`MutationExecutor`] performs a single write. [`Reconciler`] wraps it with
//! the optimistic protocol: snapshot the affected cache keys, apply the
//! predicted values, then confirm them with the server record or restore the
//! snapshot. Concurrent mutations on the same key are not queued; the last
//! write to settle wins.

mod executor;
mod places;
mod reconciler;

pub use executor::{MutationExecutor, MutationStatus};
pub use places::{CreatePlace, DeletePlace, UpdatePlace};
pub use reconciler::{MutationPhase, OptimisticUpdate, PendingMutation, Reconciler, Snapshot};
