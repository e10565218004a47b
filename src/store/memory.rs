//! # Scripted in-memory store
//!
//! Answers queries from a table of exact `(sql, params)` → reply entries.
//! Used by tests and by `check-init` dry runs; it does not interpret SQL.
//!
//! Injected latency is slept in short slices and checks the cancel token
//! between them, so an interrupted statement never takes effect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crate::sql::SqlQuery;

use super::cancel::CancelToken;
use super::errors::{StoreError, StoreResult};
use super::pool::PoolStats;
use super::result::ResultSet;
use super::Store;

const PAUSE_SLICE: Duration = Duration::from_millis(5);

/// Canned reply for one query
#[derive(Debug, Clone)]
pub enum Reply {
    /// One row whose first column is this text
    Text(String),
    /// Zero rows
    Empty,
    /// A full result set
    Rows(ResultSet),
    /// The engine fails with this message
    Error(String),
}

#[derive(Default)]
struct Behaviour {
    latency: Option<Duration>,
    ping_error: Option<String>,
    failing_statements: Vec<(String, String)>,
    pool: PoolStats,
}

/// A store whose answers are registered up front
#[derive(Default)]
pub struct MemoryStore {
    replies: RwLock<HashMap<SqlQuery, Reply>>,
    behaviour: RwLock<Behaviour>,
    executed: Mutex<Vec<String>>,
    interrupted: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the reply for an exact query
    pub fn respond(&self, query: SqlQuery, reply: Reply) -> &Self {
        self.replies
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(query, reply);
        self
    }

    /// Sleep this long inside every operation
    pub fn set_latency(&self, latency: Duration) {
        self.behaviour_mut().latency = Some(latency);
    }

    /// Make `ping` fail with a message
    pub fn fail_ping(&self, message: impl Into<String>) {
        self.behaviour_mut().ping_error = Some(message.into());
    }

    /// Make `execute` fail for any statement containing `needle`
    pub fn fail_statements_containing(&self, needle: impl Into<String>, message: impl Into<String>) {
        self.behaviour_mut()
            .failing_statements
            .push((needle.into(), message.into()));
    }

    pub fn set_pool_stats(&self, stats: PoolStats) {
        self.behaviour_mut().pool = stats;
    }

    /// Statement texts passed to `execute`, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed_log().clone()
    }

    /// Operations stopped by their cancel token
    pub fn interrupted(&self) -> usize {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn behaviour_mut(&self) -> std::sync::RwLockWriteGuard<'_, Behaviour> {
        self.behaviour.write().unwrap_or_else(|p| p.into_inner())
    }

    fn executed_log(&self) -> MutexGuard<'_, Vec<String>> {
        self.executed.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn pause(&self, cancel: &CancelToken) -> StoreResult<()> {
        let latency = self
            .behaviour
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .latency;
        if let Some(latency) = latency {
            let deadline = Instant::now() + latency;
            loop {
                self.check(cancel)?;
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    break;
                }
                thread::sleep(left.min(PAUSE_SLICE));
            }
        }
        self.check(cancel)
    }

    fn check(&self, cancel: &CancelToken) -> StoreResult<()> {
        cancel.check().map_err(|e| {
            self.interrupted.fetch_add(1, Ordering::SeqCst);
            e
        })
    }

    fn reply(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<Option<Reply>> {
        self.pause(cancel)?;
        Ok(self
            .replies
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(query)
            .cloned())
    }
}

impl Store for MemoryStore {
    fn ping(&self, cancel: &CancelToken) -> StoreResult<()> {
        self.pause(cancel)?;
        let behaviour = self.behaviour.read().unwrap_or_else(|p| p.into_inner());
        match &behaviour.ping_error {
            Some(message) => Err(StoreError::query(message.clone())),
            None => Ok(()),
        }
    }

    fn execute(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<()> {
        if let Some(Reply::Error(message)) = self.reply(query, cancel)? {
            return Err(StoreError::Query(message));
        }

        let failure = self
            .behaviour
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .failing_statements
            .iter()
            .find(|(needle, _)| query.text.contains(needle.as_str()))
            .map(|(_, message)| message.clone());
        if let Some(message) = failure {
            return Err(StoreError::Query(message));
        }

        self.executed_log().push(query.text.clone());
        Ok(())
    }

    fn fetch_text(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<Option<String>> {
        match self.reply(query, cancel)? {
            Some(Reply::Text(text)) => Ok(Some(text)),
            Some(Reply::Rows(rows)) => Ok(rows
                .rows
                .first()
                .and_then(|row| row.first())
                .map(|value| value.to_string())),
            Some(Reply::Error(message)) => Err(StoreError::Query(message)),
            Some(Reply::Empty) | None => Ok(None),
        }
    }

    fn fetch_exists(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<bool> {
        match self.reply(query, cancel)? {
            Some(Reply::Text(_)) => Ok(true),
            Some(Reply::Rows(rows)) => Ok(!rows.is_empty()),
            Some(Reply::Error(message)) => Err(StoreError::Query(message)),
            Some(Reply::Empty) | None => Ok(false),
        }
    }

    fn fetch_table(&self, query: &SqlQuery, cancel: &CancelToken) -> StoreResult<ResultSet> {
        match self.reply(query, cancel)? {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Empty) => Ok(ResultSet::default()),
            Some(Reply::Error(message)) => Err(StoreError::Query(message)),
            Some(Reply::Text(_)) | None => Err(StoreError::query(format!(
                "no result registered for: {}",
                query.text
            ))),
        }
    }

    fn pool_stats(&self) -> PoolStats {
        self.behaviour
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Column, Value};

    fn live() -> CancelToken {
        CancelToken::new()
    }

    #[test]
    fn test_exact_query_match() {
        let store = MemoryStore::new();
        let query = SqlQuery::new("SELECT html FROM pages WHERE id = ?").bind("home");
        store.respond(query.clone(), Reply::Text("<h1>Home</h1>".into()));

        assert_eq!(store.fetch_text(&query, &live()).unwrap().as_deref(), Some("<h1>Home</h1>"));

        let other = SqlQuery::new("SELECT html FROM pages WHERE id = ?").bind("about");
        assert_eq!(store.fetch_text(&other, &live()).unwrap(), None);
    }

    #[test]
    fn test_execute_records_and_fails() {
        let store = MemoryStore::new();
        store.fail_statements_containing("broken", "syntax error");

        store.execute(&SqlQuery::new("LOAD tera"), &live()).unwrap();
        let err = store.execute(&SqlQuery::new("SELECT broken"), &live()).unwrap_err();

        assert_eq!(err, StoreError::Query("syntax error".into()));
        assert_eq!(store.executed(), vec!["LOAD tera".to_string()]);
    }

    #[test]
    fn test_rows_reply() {
        let store = MemoryStore::new();
        let query = SqlQuery::new("SELECT * FROM report(base_path := '')");
        let rows = ResultSet::new(vec![Column::new("n", "INTEGER")]).with_row(vec![Value::Int(1)]);
        store.respond(query.clone(), Reply::Rows(rows.clone()));

        assert_eq!(store.fetch_table(&query, &live()).unwrap(), rows);
        assert!(store.fetch_exists(&query, &live()).unwrap());
        assert!(store.fetch_table(&SqlQuery::new("SELECT 2"), &live()).is_err());
    }

    #[test]
    fn test_ping_failure() {
        let store = MemoryStore::new();
        assert!(store.ping(&live()).is_ok());
        store.fail_ping("connection refused");
        assert_eq!(
            store.ping(&live()).unwrap_err(),
            StoreError::Query("connection refused".into())
        );
    }

    #[test]
    fn test_cancelled_execute_is_not_recorded() {
        let store = MemoryStore::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = store.execute(&SqlQuery::new("LOAD tera"), &cancel).unwrap_err();
        assert_eq!(err, StoreError::interrupted());
        assert!(store.executed().is_empty());
        assert_eq!(store.interrupted(), 1);
    }

    #[test]
    fn test_cancel_during_latency() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.set_latency(Duration::from_secs(5));
        let cancel = CancelToken::new();

        let worker = {
            let store = std::sync::Arc::clone(&store);
            let cancel = cancel.clone();
            thread::spawn(move || store.execute(&SqlQuery::new("SELECT 1"), &cancel))
        };
        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        cancel.cancel();

        assert_eq!(worker.join().unwrap(), Err(StoreError::interrupted()));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(store.executed().is_empty());
    }
}
