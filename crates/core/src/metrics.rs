//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Catalog synchronizer (runs, duration, mirror size)
//! - Search emitter (queries, chunks)
//! - Connection pool (prepared connections, reported errors)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts};

use crate::db::{DbError, PoolObserver};

// =============================================================================
// Synchronizer Metrics
// =============================================================================

/// Synchronizer runs by result.
pub static SYNC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("arrmate_sync_runs_total", "Total catalog synchronizer runs"),
        &["result"], // "success", "failed", "skipped"
    )
    .unwrap()
});

/// Wall time of a synchronizer run, fetch included.
pub static SYNC_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "arrmate_sync_duration_seconds",
            "Duration of catalog synchronizer runs",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .unwrap()
});

/// Records in the mirror after the last successful run.
pub static CATALOG_RECORDS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "arrmate_catalog_records",
        "Series held in the local catalog mirror",
    )
    .unwrap()
});

// =============================================================================
// Search Metrics
// =============================================================================

pub static SEARCH_QUERIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("arrmate_search_queries_total", "Total catalog searches").unwrap()
});

pub static SEARCH_CHUNKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arrmate_search_chunks_total",
        "Total result chunks emitted by catalog searches",
    )
    .unwrap()
});

// =============================================================================
// Pool Metrics
// =============================================================================

pub static DB_CONNECTIONS_PREPARED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arrmate_db_connections_prepared_total",
        "Physical database connections opened and prepared",
    )
    .unwrap()
});

pub static DB_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arrmate_db_errors_total",
        "Errors reported by the connection pool",
    )
    .unwrap()
});

/// Pool observer that feeds the pool metrics.
#[derive(Debug, Default)]
pub struct MetricsObserver;

impl PoolObserver for MetricsObserver {
    fn on_error(&self, _error: &DbError) {
        DB_ERRORS.inc();
    }

    fn on_connection_prepared(&self) {
        DB_CONNECTIONS_PREPARED.inc();
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Synchronizer
        Box::new(SYNC_RUNS.clone()),
        Box::new(SYNC_DURATION.clone()),
        Box::new(CATALOG_RECORDS.clone()),
        // Search
        Box::new(SEARCH_QUERIES.clone()),
        Box::new(SEARCH_CHUNKS.clone()),
        // Pool
        Box::new(DB_CONNECTIONS_PREPARED.clone()),
        Box::new(DB_ERRORS.clone()),
    ]
}
