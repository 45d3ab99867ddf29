//! Mock catalog source for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::SeriesRecord;
use crate::source::{CatalogSource, Endpoint, SourceError};

/// Mock implementation of the CatalogSource trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable snapshot
/// - Record the endpoints it was called with
/// - Fail the next fetch
/// - Delay fetches to simulate a slow remote
///
/// # Example
///
/// ```rust,ignore
/// use arrmate_core::testing::{MockCatalogSource, fixtures};
///
/// let source = MockCatalogSource::new();
/// source.set_series(vec![fixtures::series(1, "The Expanse")]).await;
/// ```
#[derive(Debug)]
pub struct MockCatalogSource {
    series: Arc<RwLock<Vec<SeriesRecord>>>,
    endpoints: Arc<RwLock<Vec<Endpoint>>>,
    next_error: Arc<RwLock<Option<SourceError>>>,
    delay: Arc<RwLock<Duration>>,
    calls: AtomicUsize,
}

impl Default for MockCatalogSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogSource {
    /// Create a mock returning an empty snapshot.
    pub fn new() -> Self {
        Self {
            series: Arc::new(RwLock::new(Vec::new())),
            endpoints: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the snapshot returned by subsequent fetches.
    pub async fn set_series(&self, series: Vec<SeriesRecord>) {
        *self.series.write().await = series;
    }

    /// Make the next fetch fail with `error`.
    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Number of fetches attempted, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.read().await.clone()
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_series(&self, endpoint: &Endpoint) -> Result<Vec<SeriesRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints.write().await.push(endpoint.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self.series.read().await.clone())
    }
}
