//! Recurring synchronizer job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::runner::CatalogSync;
use super::types::SyncOutcome;

/// Default interval between synchronizer runs.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How long `stop` waits for an in-flight run before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Runs a [`CatalogSync`] on a fixed interval, starting immediately.
///
/// Ticks that fall due while a run is still executing are dropped, so runs
/// never overlap and never pile up behind a slow remote.
pub struct SyncJob {
    tag: String,
    interval: Duration,
    sync: Arc<CatalogSync>,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SyncJob {
    pub fn new(tag: impl Into<String>, interval: Duration, sync: Arc<CatalogSync>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            tag: tag.into(),
            interval,
            sync,
            running: AtomicBool::new(false),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the job loop. Calling `start` on a running job is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!(tag = %self.tag, "Sync job already running");
            return;
        }

        let tag = self.tag.clone();
        let interval = self.interval;
        let sync = Arc::clone(&self.sync);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(tag = %tag, interval_secs = interval.as_secs(), "Sync job started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(tag = %tag, "Sync job received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match sync.run_once().await {
                            Ok(SyncOutcome::Replaced(count)) => {
                                debug!(tag = %tag, count, "Sync job run complete");
                            }
                            Ok(SyncOutcome::Skipped) => {
                                debug!(tag = %tag, "Sync job tick skipped");
                            }
                            Err(e) => {
                                warn!(tag = %tag, "Sync job run failed: {}", e);
                            }
                        }
                    }
                }
            }
            info!(tag = %tag, "Sync job stopped");
        });

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
    }

    /// Signal the loop to stop and wait for it to exit.
    ///
    /// A run in progress gets a short grace period before the task is aborted.
    /// An aborted run drops its transaction, which rolls back.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!(tag = %self.tag, "Sync job not running");
            return;
        }

        let _ = self.shutdown_tx.send(());

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(mut handle) = handle {
            if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
                warn!(tag = %self.tag, "Sync job did not stop in time, aborting");
                handle.abort();
            }
        }
    }
}

impl Drop for SyncJob {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.handle.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
