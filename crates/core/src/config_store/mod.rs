//! Durable key/value settings kept in the `config` table.
//!
//! The CLI writes entries such as `starr.sonarr.url`; the bot and the catalog
//! synchronizer read them back. A missing key is a normal result (`None`),
//! not an error.

mod store;

pub use store::ConfigStore;

use thiserror::Error;

use crate::db::DbError;

/// Well-known configuration keys.
pub mod keys {
    pub const SONARR_URL: &str = "starr.sonarr.url";
    pub const SONARR_TOKEN: &str = "starr.sonarr.token";
}

/// Errors for configuration store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Database error: {0}")]
    Database(String),

    /// A key required by a dependent operation has never been set.
    #[error("no config for {0}")]
    MissingKey(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
