//! DuckDB backend.
//!
//! One database instance is opened at provisioning; pooled connections are
//! cloned from it so they share catalog, loaded extensions and macros
//! created by the init script.
//!
//! While a statement runs, its cancel token holds the connection's interrupt
//! handle. A connection whose statement was interrupted, or that no longer
//! answers `SELECT 1` after a failure, is discarded instead of reused.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use duckdb::arrow::datatypes::DataType;
use duckdb::types::Value as DuckValue;
use duckdb::{params_from_iter, AccessMode, Config, Connection};

use crate::sql::SqlQuery;

use super::cancel::CancelToken;
use super::errors::{StoreError, StoreResult};
use super::pool::{Pool, PoolStats, Pooled};
use super::result::{Column, ResultSet, Value};
use super::{Store, StoreOptions};

const IN_MEMORY: &str = ":memory:";

/// Pooled DuckDB store
pub struct DuckDbStore {
    pool: Arc<Pool<Connection>>,
    acquire_timeout: Option<Duration>,
}

impl DuckDbStore {
    /// Open the database and prepare the pool; no connection is handed out yet
    pub fn open(options: &StoreOptions) -> StoreResult<Self> {
        let in_memory = options.database_path.is_empty() || options.database_path == IN_MEMORY;

        let mut config = Config::default();
        if options.read_only && !in_memory {
            config = config
                .access_mode(AccessMode::ReadOnly)
                .map_err(|e| StoreError::Open(e.to_string()))?;
        }

        let root = if in_memory {
            Connection::open_in_memory_with_flags(config)
        } else {
            Connection::open_with_flags(&options.database_path, config)
        }
        .map_err(|e| StoreError::Open(e.to_string()))?;

        let root = Mutex::new(root);
        let pool = Pool::new(options.pool_size, move || {
            root.lock()
                .unwrap_or_else(|p| p.into_inner())
                .try_clone()
                .map_err(|e| StoreError::Open(e.to_string()))
        });

        Ok(Self {
            pool,
            acquire_timeout: options.acquire_timeout,
        })
    }

    fn with_connection<T>(
        &self,
        cancel: &CancelToken,
        op: impl FnOnce(&Connection) -> duckdb::Result<T>,
    ) -> StoreResult<T> {
        cancel.check()?;
        let conn: Pooled<Connection> = self.pool.acquire(self.acquire_timeout)?;

        let handle = conn.interrupt_handle();
        let registration = cancel.on_cancel(move || handle.interrupt());
        let outcome = op(&conn);
        drop(registration);

        match outcome {
            Ok(value) => Ok(value),
            Err(e) => {
                let interrupted = cancel.is_cancelled();
                if interrupted || !is_alive(&conn) {
                    conn.discard();
                }
                if interrupted {
                    Err(StoreError::interrupted())
                } else {
                    Err(StoreError::Query(e.to_string()))
                }
            }
        }
    }
}

impl Store for DuckDbStore {
    fn ping(&self, cancel: &CancelToken) -> StoreResult<()> {
        self.with_connection(cancel, |conn| conn.execute_batch("SELECT 1"))
    }

    fn execute(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<()> {
        self.with_connection(cancel, |conn| {
            if query.has_params() {
                conn.execute(&query.text, params_from_iter(query.params.iter()))
                    .map(|_| ())
            } else {
                conn.execute_batch(&query.text)
            }
        })
    }

    fn fetch_text(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<Option<String>> {
        self.with_connection(cancel, |conn| {
            let mut stmt = conn.prepare(&query.text)?;
            let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
            match rows.next()? {
                Some(row) => {
                    let html: Option<String> = row.get(0)?;
                    Ok(Some(html.unwrap_or_default()))
                }
                None => Ok(None),
            }
        })
    }

    fn fetch_exists(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<bool> {
        self.with_connection(cancel, |conn| {
            let mut stmt = conn.prepare(&query.text)?;
            let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
            Ok(rows.next()?.is_some())
        })
    }

    fn fetch_table(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<ResultSet> {
        self.with_connection(cancel, |conn| {
            let mut stmt = conn.prepare(&query.text)?;
            let mut rows = stmt.query(params_from_iter(query.params.iter()))?;

            let columns: Vec<Column> = match rows.as_ref() {
                Some(stmt) => stmt
                    .column_names()
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| Column::new(name, type_tag(&stmt.column_type(i))))
                    .collect(),
                None => Vec::new(),
            };

            let mut result = ResultSet::new(columns);
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(result.columns.len());
                for i in 0..result.columns.len() {
                    values.push(convert(row.get::<_, DuckValue>(i)?));
                }
                result.rows.push(values);
            }
            Ok(result)
        })
    }

    fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

fn is_alive(conn: &Connection) -> bool {
    conn.execute_batch("SELECT 1").is_ok()
}

/// Engine type name for an Arrow column type
fn type_tag(data_type: &DataType) -> String {
    match data_type {
        DataType::Int8 => "TINYINT".to_string(),
        DataType::Int16 => "SMALLINT".to_string(),
        DataType::Int32 => "INTEGER".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::UInt8 => "UTINYINT".to_string(),
        DataType::UInt16 => "USMALLINT".to_string(),
        DataType::UInt32 => "UINTEGER".to_string(),
        DataType::UInt64 => "UBIGINT".to_string(),
        DataType::Float32 => "FLOAT".to_string(),
        DataType::Float64 => "DOUBLE".to_string(),
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => "DECIMAL".to_string(),
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 => "VARCHAR".to_string(),
        other => other.to_string().to_uppercase(),
    }
}

fn convert(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::Int(n.into()),
        DuckValue::SmallInt(n) => Value::Int(n.into()),
        DuckValue::Int(n) => Value::Int(n.into()),
        DuckValue::BigInt(n) => Value::Int(n),
        DuckValue::UTinyInt(n) => Value::UInt(n.into()),
        DuckValue::USmallInt(n) => Value::UInt(n.into()),
        DuckValue::UInt(n) => Value::UInt(n.into()),
        DuckValue::UBigInt(n) => Value::UInt(n),
        DuckValue::HugeInt(n) => Value::Text(n.to_string()),
        DuckValue::Float(x) => Value::Float(x.into()),
        DuckValue::Double(x) => Value::Float(x),
        DuckValue::Decimal(d) => Value::Text(d.to_string()),
        DuckValue::Text(s) => Value::Text(s),
        other => Value::Text(format!("{:?}", other)),
    }
}
