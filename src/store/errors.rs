//! Store errors

use std::time::Duration;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by the backing store or the layer around it.
///
/// None of these are retried; each is surfaced once to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The database could not be opened or a connection created
    #[error("failed to open database: {0}")]
    Open(String),

    /// The engine rejected or failed a statement
    #[error("query failed: {0}")]
    Query(String),

    /// The operation did not finish within the configured timeout
    #[error("store operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The operation was interrupted or its worker went away
    #[error("store operation cancelled: {0}")]
    Cancelled(String),

    /// No connection became available in time
    #[error("connection pool exhausted")]
    PoolExhausted,
}

impl StoreError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// The statement was stopped through its cancel token
    pub fn interrupted() -> Self {
        Self::Cancelled("interrupted".to_string())
    }
}
