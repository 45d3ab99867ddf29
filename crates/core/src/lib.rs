pub mod catalog;
pub mod config;
pub mod config_store;
pub mod db;
pub mod metrics;
pub mod source;
pub mod sync;
pub mod testing;

pub use catalog::{CatalogError, SeriesMirror, SeriesRecord, SeriesSearch, CHUNK_THRESHOLD};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    LoggingConfig, ServerConfig, SyncConfig,
};
pub use config_store::{keys, ConfigStore, StoreError};
pub use db::{DbError, Pool, PoolObserver, PoolOptions, Schema};
pub use source::{CatalogSource, Endpoint, SonarrSource, SourceError};
pub use sync::{CatalogSync, SyncError, SyncJob, SyncOutcome, SyncState, SyncStatus};
