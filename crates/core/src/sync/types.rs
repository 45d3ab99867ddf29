use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config_store::StoreError;
use crate::source::SourceError;

/// Where the synchronizer currently is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Fetching,
    Replacing,
    Failed,
}

/// Result of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "records")]
pub enum SyncOutcome {
    /// The mirror now holds this many records.
    Replaced(usize),
    /// Another run was in progress; nothing was done.
    Skipped,
}

/// Observable synchronizer bookkeeping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_record_count: Option<usize>,
    pub runs: u64,
    pub failures: u64,
    pub skipped: u64,
}

/// Errors that abort a synchronizer run. The mirror is left untouched.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("mirror update failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("sync task failed: {0}")]
    Task(String),
}
