//! Testing utilities and mock implementations.
//!
//! Lets the synchronizer, the search emitter and the HTTP surface be exercised
//! without a real Sonarr instance.
//!
//! # Example
//!
//! ```rust,ignore
//! use arrmate_core::testing::{fixtures, MockCatalogSource};
//!
//! let pool = fixtures::memory_pool();
//! let source = MockCatalogSource::new();
//! source.set_series(vec![fixtures::series(1, "Severance")]).await;
//! ```

mod mock_source;

pub use mock_source::MockCatalogSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::catalog::SeriesRecord;
    use crate::db::{Pool, PoolOptions, Schema};

    /// Create a series record with reasonable defaults.
    ///
    /// Status is "continuing", added 2020-01-01, never aired, one season.
    pub fn series(id: i64, title: &str) -> SeriesRecord {
        SeriesRecord {
            id,
            title: title.to_string(),
            status: "continuing".to_string(),
            overview: String::new(),
            previous_airing: None,
            network: String::new(),
            added: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            genres: Vec::new(),
            seasons: 1,
            monitored: false,
        }
    }

    /// Create an ended series with the fields a real snapshot carries.
    pub fn ended_series(id: i64, title: &str, network: &str, last_aired: NaiveDate) -> SeriesRecord {
        SeriesRecord {
            status: "ended".to_string(),
            network: network.to_string(),
            previous_airing: Some(last_aired),
            genres: vec!["Drama".to_string()],
            monitored: true,
            ..series(id, title)
        }
    }

    /// Open a private, fully migrated in-memory pool.
    ///
    /// Panics if the bundled schema cannot be applied.
    pub fn memory_pool() -> Pool {
        Pool::open_in_memory(&Schema::bundled(), PoolOptions::default())
            .unwrap_or_else(|e| panic!("failed to open in-memory pool: {e}"))
    }
}
