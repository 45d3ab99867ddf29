//! Pooled SQLite connections gated on schema migration.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use r2d2::{CustomizeConnection, HandleError, ManageConnection, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use super::{DbError, Schema};

/// A connection checked out of the pool. Dropping it returns it to the idle set.
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// How long a waiter blocks inside r2d2 before re-checking for shutdown.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Lock wait applied to every connection before SQLITE_BUSY is returned.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Observer for pool lifecycle events.
///
/// Purely informational: nothing a hook does changes the outcome of `open` or
/// `get`. Every method defaults to a no-op.
pub trait PoolObserver: Send + Sync + fmt::Debug {
    fn on_start_migrate(&self) {}
    fn on_ready(&self) {}
    fn on_error(&self, _error: &DbError) {}
    fn on_connection_prepared(&self) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl PoolObserver for NoopObserver {}

/// Pool construction options.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Upper bound on physical connections.
    pub max_size: u32,
    /// Default deadline used by [`Pool::get`].
    pub acquire_timeout: Duration,
    pub observer: Arc<dyn PoolObserver>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 8,
            acquire_timeout: Duration::from_secs(30),
            observer: Arc::new(NoopObserver),
        }
    }
}

impl PoolOptions {
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PoolObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub connections: u32,
    pub idle_connections: u32,
}

/// Runs once per physical connection, right after it is opened.
#[derive(Debug)]
struct ConnectionSetup {
    observer: Arc<dyn PoolObserver>,
    prepared: Arc<AtomicUsize>,
}

/// Per-connection pragmas. Returns the journal mode SQLite settled on.
fn apply_pragmas(conn: &Connection) -> Result<String, rusqlite::Error> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    Ok(mode)
}

impl CustomizeConnection<Connection, rusqlite::Error> for ConnectionSetup {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        let mode = apply_pragmas(conn)?;

        let total = self.prepared.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(journal_mode = %mode, total, "Prepared database connection");
        self.observer.on_connection_prepared();
        Ok(())
    }
}

/// Most recent failure r2d2 hit while opening or preparing a connection.
#[derive(Debug, Default)]
struct ConnectFailure {
    last: Mutex<Option<(Instant, String)>>,
}

impl ConnectFailure {
    fn record(&self, message: String) {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        *last = Some((Instant::now(), message));
    }

    /// The failure message, if one was recorded at or after `since`.
    fn since(&self, since: Instant) -> Option<String> {
        let last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        match &*last {
            Some((at, message)) if *at >= since => Some(message.clone()),
            _ => None,
        }
    }
}

/// Forwards background connection failures to tracing and the observer.
#[derive(Debug)]
struct ErrorReporter {
    observer: Arc<dyn PoolObserver>,
    failure: Arc<ConnectFailure>,
}

impl HandleError<rusqlite::Error> for ErrorReporter {
    fn handle_error(&self, error: rusqlite::Error) {
        warn!("Error in sqlite connection: {}", error);
        self.failure.record(error.to_string());
        self.observer.on_error(&DbError::Sqlite(error));
    }
}

struct PoolInner {
    pool: RwLock<Option<r2d2::Pool<SqliteConnectionManager>>>,
    closed: AtomicBool,
    location: String,
    acquire_timeout: Duration,
    prepared: Arc<AtomicUsize>,
    failure: Arc<ConnectFailure>,
}

/// Bounded pool of connections to one database file.
///
/// Construction applies every pending migration before returning, so no
/// caller can ever check out a connection to an unmigrated schema.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("location", &self.inner.location)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Pool {
    /// Open (or create) the database at `path` and migrate it to `schema`.
    pub fn open(
        path: impl AsRef<Path>,
        schema: &Schema,
        options: PoolOptions,
    ) -> Result<Self, DbError> {
        let path = path.as_ref();
        Self::build(
            SqliteConnectionManager::file(path),
            path.display().to_string(),
            schema,
            options,
        )
    }

    /// Open a private in-memory database shared by every connection of this pool.
    pub fn open_in_memory(schema: &Schema, options: PoolOptions) -> Result<Self, DbError> {
        let uri = format!(
            "file:arrmate-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4()
        );
        Self::build(
            SqliteConnectionManager::file(&uri),
            uri.clone(),
            schema,
            options,
        )
    }

    fn build(
        manager: SqliteConnectionManager,
        location: String,
        schema: &Schema,
        options: PoolOptions,
    ) -> Result<Self, DbError> {
        let observer = options.observer;
        let prepared = Arc::new(AtomicUsize::new(0));
        let failure = Arc::new(ConnectFailure::default());

        // r2d2 retries a failing connect until its deadline. Opening one
        // connection up front turns an unusable file into an immediate error.
        // It also keeps a shared in-memory database alive until the pool
        // holds a connection of its own.
        let first = manager
            .connect()
            .and_then(|conn| apply_pragmas(&conn).map(|_| conn))
            .map_err(|e| DbError::Open(e.to_string()));
        let _first = match first {
            Ok(conn) => conn,
            Err(e) => {
                error!(location = %location, "Cannot open database: {}", e);
                observer.on_error(&e);
                return Err(e);
            }
        };

        let pool = r2d2::Pool::builder()
            .max_size(options.max_size)
            .min_idle(Some(0))
            .idle_timeout(None)
            .max_lifetime(None)
            .test_on_check_out(false)
            .connection_timeout(options.acquire_timeout)
            .error_handler(Box::new(ErrorReporter {
                observer: Arc::clone(&observer),
                failure: Arc::clone(&failure),
            }))
            .connection_customizer(Box::new(ConnectionSetup {
                observer: Arc::clone(&observer),
                prepared: Arc::clone(&prepared),
            }))
            .build(manager)
            .map_err(|e| DbError::Open(e.to_string()))?;

        debug!(location = %location, "Starting SQL migrations");
        observer.on_start_migrate();

        let migrated = pool
            .get_timeout(options.acquire_timeout)
            .map_err(|e| DbError::Open(e.to_string()))
            .and_then(|mut conn| schema.apply(&mut conn));

        match migrated {
            Ok(applied) => {
                info!(
                    location = %location,
                    version = schema.version(),
                    applied,
                    "Database ready"
                );
                observer.on_ready();
            }
            Err(e) => {
                error!(location = %location, "Database migration failed: {}", e);
                observer.on_error(&e);
                return Err(e);
            }
        }

        Ok(Self {
            inner: Arc::new(PoolInner {
                pool: RwLock::new(Some(pool)),
                closed: AtomicBool::new(false),
                location,
                acquire_timeout: options.acquire_timeout,
                prepared,
                failure,
            }),
        })
    }

    /// Check out a connection, waiting up to the configured acquire timeout.
    pub fn get(&self) -> Result<PooledConn, DbError> {
        self.get_timeout(self.inner.acquire_timeout)
    }

    /// Check out a connection, waiting at most `timeout`.
    ///
    /// Fails with [`DbError::PoolClosed`] as soon as the pool is closed, even
    /// while waiting. A connection that cannot be opened or prepared fails
    /// with [`DbError::Open`]; [`DbError::ConnectionUnavailable`] means every
    /// connection stayed busy until the deadline.
    pub fn get_timeout(&self, timeout: Duration) -> Result<PooledConn, DbError> {
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            let pool = self.current()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(timeout = ?timeout, "Timed out waiting for a database connection");
                return Err(DbError::ConnectionUnavailable(timeout));
            }

            match pool.get_timeout(remaining.min(WAIT_SLICE)) {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    if let Some(cause) = self.inner.failure.since(started) {
                        error!(location = %self.inner.location, "Cannot open database connection: {}", cause);
                        return Err(DbError::Open(cause));
                    }
                    debug!("Still waiting for a database connection: {}", e);
                }
            }
        }
    }

    /// Run `f` with a connection that is returned to the pool afterwards.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> T,
    ) -> Result<T, DbError> {
        let mut conn = self.get()?;
        Ok(f(&mut conn))
    }

    /// Close the pool. Idle connections are released once no caller holds one.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(location = %self.inner.location, "Closing database");
        let mut slot = self
            .inner
            .pool
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of physical connections that went through per-connection setup.
    pub fn prepared_connections(&self) -> usize {
        self.inner.prepared.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> Result<PoolState, DbError> {
        let state = self.current()?.state();
        Ok(PoolState {
            connections: state.connections,
            idle_connections: state.idle_connections,
        })
    }

    /// Schema version recorded in the database header.
    pub fn schema_version(&self) -> Result<i64, DbError> {
        let conn = self.get()?;
        let version = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    fn current(&self) -> Result<r2d2::Pool<SqliteConnectionManager>, DbError> {
        if self.is_closed() {
            return Err(DbError::PoolClosed);
        }
        let slot = self
            .inner
            .pool
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.clone().ok_or(DbError::PoolClosed)
    }
}
