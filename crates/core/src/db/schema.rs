//! Migration registry.
//!
//! Schema changes live as SQL scripts under `crates/core/migrations/` and are
//! embedded at compile time. The database's `user_version` pragma records how
//! many scripts have been applied; each script runs in its own transaction so
//! a failure leaves the file at the last committed version.

use rusqlite::Connection;
use tracing::{debug, info};

use super::DbError;

/// Application id stamped into the database header.
pub const APPLICATION_ID: i32 = 0xbf7294;

/// One schema-change script, identified by its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    id: String,
    sql: String,
}

impl Migration {
    pub fn new(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sql: sql.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Immutable, ordered set of migrations handed to the pool at startup.
#[derive(Debug, Clone)]
pub struct Schema {
    application_id: i32,
    migrations: Vec<Migration>,
}

impl Schema {
    /// Build a schema from scripts in any order; they are sorted by id.
    pub fn new(application_id: i32, mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            application_id,
            migrations,
        }
    }

    /// The scripts shipped with this build.
    pub fn bundled() -> Self {
        Self::new(
            APPLICATION_ID,
            vec![
                Migration::new(
                    "0002_sonarr.sql",
                    include_str!("../../migrations/0002_sonarr.sql"),
                ),
                Migration::new(
                    "0001_config.sql",
                    include_str!("../../migrations/0001_config.sql"),
                ),
            ],
        )
    }

    pub fn application_id(&self) -> i32 {
        self.application_id
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Schema version a fully migrated database reports.
    pub fn version(&self) -> i64 {
        self.migrations.len() as i64
    }

    /// Bring `conn` up to date. Returns the number of scripts applied.
    pub(crate) fn apply(&self, conn: &mut Connection) -> Result<usize, DbError> {
        let application_id: i32 = conn
            .pragma_query_value(None, "application_id", |row| row.get(0))
            .map_err(|e| DbError::migration("application_id", e))?;
        if application_id != 0 && application_id != self.application_id {
            return Err(DbError::migration(
                "application_id",
                format!(
                    "database belongs to application {:#x}, expected {:#x}",
                    application_id, self.application_id
                ),
            ));
        }

        let current: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| DbError::migration("user_version", e))?;
        if current < 0 || current > self.version() {
            return Err(DbError::migration(
                "user_version",
                format!(
                    "database schema version {} is not supported by this build ({})",
                    current,
                    self.version()
                ),
            ));
        }

        let pending = &self.migrations[current as usize..];
        if pending.is_empty() {
            debug!(version = current, "Schema is up to date");
            return Ok(0);
        }

        for (offset, migration) in pending.iter().enumerate() {
            let version = current + offset as i64 + 1;
            debug!(script = migration.id(), version, "Applying migration");

            let tx = conn
                .transaction()
                .map_err(|e| DbError::migration(migration.id(), e))?;
            tx.execute_batch(migration.sql())
                .map_err(|e| DbError::migration(migration.id(), e))?;
            tx.pragma_update(None, "application_id", self.application_id)
                .map_err(|e| DbError::migration(migration.id(), e))?;
            tx.pragma_update(None, "user_version", version)
                .map_err(|e| DbError::migration(migration.id(), e))?;
            tx.commit()
                .map_err(|e| DbError::migration(migration.id(), e))?;
        }

        info!(
            from = current,
            to = self.version(),
            "Applied {} schema migration(s)",
            pending.len()
        );
        Ok(pending.len())
    }
}
