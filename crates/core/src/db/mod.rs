//! Embedded database: migration registry and connection pool.
//!
//! Every other store in the crate shares one [`Pool`]. The pool applies the
//! bundled [`Schema`] before handing out any connection and prepares each
//! physical connection (foreign keys, WAL journaling) exactly once.

mod error;
mod pool;
mod schema;

pub use error::DbError;
pub use pool::{NoopObserver, Pool, PoolObserver, PoolOptions, PoolState, PooledConn};
pub use schema::{Migration, Schema, APPLICATION_ID};
