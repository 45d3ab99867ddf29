//! One synchronizer run: read credentials, fetch, replace.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::types::{SyncError, SyncOutcome, SyncState, SyncStatus};
use crate::catalog::SeriesMirror;
use crate::config_store::{keys, ConfigStore};
use crate::metrics;
use crate::source::{CatalogSource, Endpoint};

/// Pulls a full snapshot from a [`CatalogSource`] into the series mirror.
///
/// At most one run is active at a time. A trigger that arrives while a run is
/// in progress is skipped rather than queued. A failed run leaves the state at
/// [`SyncState::Failed`] until the next trigger starts.
///
/// Each run executes on its own task. Dropping the future returned by
/// [`CatalogSync::run_once`] does not stop the run; it still completes and
/// records its result.
pub struct CatalogSync {
    config_store: ConfigStore,
    mirror: SeriesMirror,
    source: Arc<dyn CatalogSource>,
    url_key: String,
    token_key: String,
    run_lock: Mutex<()>,
    status: RwLock<SyncStatus>,
}

impl CatalogSync {
    /// Create a synchronizer reading the Sonarr endpoint keys.
    pub fn new(
        config_store: ConfigStore,
        mirror: SeriesMirror,
        source: Arc<dyn CatalogSource>,
    ) -> Self {
        Self {
            config_store,
            mirror,
            source,
            url_key: keys::SONARR_URL.to_string(),
            token_key: keys::SONARR_TOKEN.to_string(),
            run_lock: Mutex::new(()),
            status: RwLock::new(SyncStatus::default()),
        }
    }

    /// Read the endpoint from different configuration keys.
    pub fn with_keys(mut self, url_key: &str, token_key: &str) -> Self {
        self.url_key = url_key.to_string();
        self.token_key = token_key.to_string();
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Run once now, unless a run is already in progress.
    pub async fn run_once(self: &Arc<Self>) -> Result<SyncOutcome, SyncError> {
        let sync = Arc::clone(self);
        tokio::spawn(async move { sync.run_tracked().await })
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
    }

    async fn run_tracked(&self) -> Result<SyncOutcome, SyncError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            info!(source = self.source.name(), "Sync already running, skipping trigger");
            metrics::SYNC_RUNS.with_label_values(&["skipped"]).inc();
            self.status.write().await.skipped += 1;
            return Ok(SyncOutcome::Skipped);
        };

        let started = Instant::now();
        {
            let mut status = self.status.write().await;
            if status.state == SyncState::Failed {
                debug!(source = self.source.name(), "Leaving failed state");
            }
            status.state = SyncState::Fetching;
            status.last_started_at = Some(Utc::now());
            status.runs += 1;
        }

        let result = self.execute().await;
        metrics::SYNC_DURATION.observe(started.elapsed().as_secs_f64());

        let mut status = self.status.write().await;
        status.last_finished_at = Some(Utc::now());
        match &result {
            Ok(count) => {
                info!(source = self.source.name(), count, "Catalog sync finished");
                metrics::SYNC_RUNS.with_label_values(&["success"]).inc();
                metrics::CATALOG_RECORDS.set(*count as i64);
                status.state = SyncState::Idle;
                status.last_error = None;
                status.last_record_count = Some(*count);
            }
            Err(e) => {
                warn!(source = self.source.name(), "Catalog sync failed: {}", e);
                metrics::SYNC_RUNS.with_label_values(&["failed"]).inc();
                status.state = SyncState::Failed;
                status.last_error = Some(e.to_string());
                status.failures += 1;
            }
        }

        result.map(SyncOutcome::Replaced)
    }

    async fn execute(&self) -> Result<usize, SyncError> {
        let endpoint = self.endpoint()?;

        // No connection is held while talking to the remote.
        debug!(source = self.source.name(), url = %endpoint.url, "Fetching catalog snapshot");
        let records = self.source.fetch_series(&endpoint).await?;

        self.status.write().await.state = SyncState::Replacing;
        debug!(count = records.len(), "Replacing series mirror");

        let mirror = self.mirror.clone();
        let count = tokio::task::spawn_blocking(move || mirror.replace(&records))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))??;
        Ok(count)
    }

    fn endpoint(&self) -> Result<Endpoint, SyncError> {
        let url = self.config_store.require(&self.url_key)?;
        let token = self.config_store.require(&self.token_key)?;
        Ok(Endpoint::new(url, token))
    }
}
