//! Placeboard - admin client for a geo-tagged places directory
//!
//! Fetched data lives in a keyed [`query::QueryCache`]. Writes go through
//! [`mutation::Reconciler`], which patches the cache optimistically, sends
//! the request, and then either confirms the server record or restores the
//! snapshot. Images are uploaded to third-party storage by
//! [`upload::UploadCoordinator`] before a place is written.
//!
//! [`dashboard::Dashboard`] wires these together for the `placeboard` binary.

pub mod api;
pub mod audit;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod mutation;
pub mod queries;
pub mod query;
pub mod session;
pub mod ui;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use error::{PlaceboardError, PlaceboardResult};
