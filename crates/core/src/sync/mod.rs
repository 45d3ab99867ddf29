//! Catalog synchronizer.
//!
//! [`CatalogSync`] performs a single fetch-and-replace against the series
//! mirror. [`SyncJob`] drives it on a fixed interval in the background.

mod job;
mod runner;
mod types;

pub use job::{SyncJob, DEFAULT_SYNC_INTERVAL};
pub use runner::CatalogSync;
pub use types::{SyncError, SyncOutcome, SyncState, SyncStatus};
