//! # Backing store
//!
//! The store is the SQL engine pages are rendered in. Handlers see it only
//! through the [`Store`] trait: one statement per call, connection
//! acquisition and release hidden behind it.
//!
//! Store calls are synchronous and take a [`CancelToken`]. Request handlers
//! go through [`run_blocking`], which moves the call onto the blocking worker
//! pool, bounds it with the configured timeout and interrupts the statement
//! when the timeout fires or the request goes away.

mod cancel;
mod errors;
mod memory;
mod pool;
mod result;

#[cfg(feature = "duckdb")]
mod duckdb;

use std::sync::Arc;
use std::time::Duration;

use crate::sql::SqlQuery;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbStore;
pub use cancel::{CancelOnDrop, CancelRegistration, CancelToken};
pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryStore, Reply};
pub use pool::{Pool, PoolStats, Pooled};
pub use result::{Column, ResultSet, Value};

/// A SQL-capable backing store.
///
/// Implementations must be shareable across request tasks; each method
/// acquires a connection, runs one statement and releases it.
///
/// Once `cancel` fires, the running statement must stop and the method
/// return `StoreError::Cancelled` without completing its work.
pub trait Store: Send + Sync {
    /// Lightweight connectivity probe
    fn ping(&self, cancel: &CancelToken) -> StoreResult<()>;

    /// Run a statement for its side effects
    fn execute(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<()>;

    /// First column of the first row, `None` when no row matched.
    /// A SQL NULL reads as an empty string.
    fn fetch_text(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<Option<String>>;

    /// Whether the query returned at least one row
    fn fetch_exists(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<bool>;

    /// The full result with column types
    fn fetch_table(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<ResultSet>;

    /// Current connection pool counters
    fn pool_stats(&self) -> PoolStats;
}

/// How to open the backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub database_path: String,
    pub read_only: bool,
    pub pool_size: usize,
    /// Longest wait for a free pooled connection
    pub acquire_timeout: Option<Duration>,
}

/// Run one store operation off the async runtime, bounded by `timeout`.
///
/// The operation's token is cancelled when the timeout fires or when the
/// returned future is dropped (client disconnect), whichever comes first.
pub async fn run_blocking<T, F>(
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
    op: F,
) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn Store, &CancelToken) -> StoreResult<T> + Send + 'static,
{
    let token = CancelToken::new();
    let guard = token.drop_guard();
    let worker = token.clone();
    let task = tokio::task::spawn_blocking(move || op(store.as_ref(), &worker));

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            // `guard` drops here and interrupts the statement
            Err(_) => return Err(StoreError::Timeout(limit)),
        },
        None => task.await,
    };
    guard.disarm();

    joined.map_err(|e| StoreError::Cancelled(e.to_string()))?
}
