use std::time::Duration;

use thiserror::Error;

/// Errors raised by the connection pool and the migration runner.
#[derive(Debug, Error)]
pub enum DbError {
    /// A bundled migration script could not be applied. Fatal at startup.
    #[error("schema migration {script} failed: {cause}")]
    SchemaMigrationFailed { script: String, cause: String },

    #[error("connection pool already closed")]
    PoolClosed,

    /// No connection became free before the acquire deadline.
    #[error("no database connection available within {0:?}")]
    ConnectionUnavailable(Duration),

    #[error("failed to open database: {0}")]
    Open(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    pub(crate) fn migration(script: &str, cause: impl ToString) -> Self {
        Self::SchemaMigrationFailed {
            script: script.to_string(),
            cause: cause.to_string(),
        }
    }
}
