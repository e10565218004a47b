//! # Health report
//!
//! A fixed battery of independent probes against the store. Every probe
//! is timed and runs even when an earlier one failed; the report is never
//! cached.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::HandlerConfig;
use crate::observability::Timer;
use crate::sql::QueryBuilder;
use crate::store::{run_blocking, CancelToken, PoolStats, Store, StoreError};

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";
pub const CHECK_OK: &str = "ok";
pub const CHECK_ERROR: &str = "error";

/// Error reported for a macro missing from the function catalog
pub const MACRO_NOT_FOUND: &str = "macro not found";

/// One probe outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    /// Table or macro the probe targeted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl CheckResult {
    fn from_outcome(name: Option<String>, elapsed: Duration, outcome: Result<(), String>) -> Self {
        let latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(()) => Self {
                status: CHECK_OK,
                name,
                latency_ms,
                error: None,
            },
            Err(message) => Self {
                status: CHECK_ERROR,
                name,
                latency_ms,
                error: Some(message),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CHECK_OK
    }
}

/// Aggregated report, serialized as the health endpoint body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub checks: BTreeMap<String, CheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == STATUS_HEALTHY
    }

    /// 200 when healthy, 503 otherwise
    pub fn http_status(&self) -> u16 {
        if self.is_healthy() {
            200
        } else {
            503
        }
    }
}

/// Runs the configured checks
pub struct HealthEvaluator {
    store: Arc<dyn Store>,
    config: Arc<HandlerConfig>,
    timeout: Option<Duration>,
}

impl HealthEvaluator {
    pub fn new(store: Arc<dyn Store>, config: Arc<HandlerConfig>, timeout: Option<Duration>) -> Self {
        Self {
            store,
            config,
            timeout,
        }
    }

    /// Names of the macro checks that apply, in report order
    fn macro_checks(&self) -> Vec<(&'static str, String)> {
        let config = &self.config;
        let mut checks = Vec::new();
        if config.index_enabled {
            checks.push(("index_macro", config.index_macro.clone()));
        }
        if config.search_enabled {
            checks.push(("search_macro", config.search_macro.clone()));
        }
        if let Some(name) = &config.record_macro {
            checks.push(("record_macro", name.clone()));
        }
        if let Some(name) = &config.table_macro {
            checks.push(("table_macro", name.clone()));
        }
        checks
    }

    pub async fn evaluate(&self) -> HealthReport {
        let mut checks = BTreeMap::new();

        let timer = Timer::new();
        let outcome = self.probe(|store, cancel| store.ping(cancel)).await;
        checks.insert(
            "database".to_string(),
            CheckResult::from_outcome(None, timer.elapsed(), outcome),
        );

        let query = QueryBuilder::new(&self.config).table_probe();
        let timer = Timer::new();
        let outcome = self
            .probe(move |store, cancel| store.fetch_exists(&query, cancel).map(|_| ()))
            .await;
        checks.insert(
            "table".to_string(),
            CheckResult::from_outcome(Some(self.config.table.clone()), timer.elapsed(), outcome),
        );

        for (check, macro_name) in self.macro_checks() {
            let query = QueryBuilder::new(&self.config).macro_probe(&macro_name);
            let timer = Timer::new();
            let outcome = match run_blocking(Arc::clone(&self.store), self.timeout, move |store, cancel| {
                store.fetch_exists(&query, cancel)
            })
            .await
            {
                Ok(true) => Ok(()),
                Ok(false) => Err(MACRO_NOT_FOUND.to_string()),
                Err(e) => Err(e.to_string()),
            };
            checks.insert(
                check.to_string(),
                CheckResult::from_outcome(Some(macro_name), timer.elapsed(), outcome),
            );
        }

        let healthy = checks.values().all(CheckResult::is_ok);
        HealthReport {
            status: if healthy { STATUS_HEALTHY } else { STATUS_UNHEALTHY },
            checks,
            pool: self.config.health_detailed.then(|| self.store.pool_stats()),
        }
    }

    async fn probe<F>(&self, op: F) -> Result<(), String>
    where
        F: FnOnce(&dyn Store, &CancelToken) -> Result<(), StoreError> + Send + 'static,
    {
        run_blocking(Arc::clone(&self.store), self.timeout, op)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Reply};

    fn config() -> HandlerConfig {
        let mut config = HandlerConfig::for_table("pages");
        config.validate().unwrap();
        config
    }

    fn evaluator(store: MemoryStore, config: HandlerConfig) -> HealthEvaluator {
        HealthEvaluator::new(Arc::new(store), Arc::new(config), Some(Duration::from_secs(1)))
    }

    fn with_table(store: &MemoryStore, config: &HandlerConfig) {
        store.respond(QueryBuilder::new(config).table_probe(), Reply::Text("1".into()));
    }

    fn with_macro(store: &MemoryStore, config: &HandlerConfig, name: &str) {
        store.respond(QueryBuilder::new(config).macro_probe(name), Reply::Text("1".into()));
    }

    #[tokio::test]
    async fn test_basic_checks_healthy() {
        let config = config();
        let store = MemoryStore::new();
        with_table(&store, &config);

        let report = evaluator(store, config).evaluate().await;
        assert!(report.is_healthy());
        assert_eq!(report.http_status(), 200);
        assert_eq!(
            report.checks.keys().collect::<Vec<_>>(),
            vec!["database", "table"]
        );
        assert_eq!(report.checks["table"].name.as_deref(), Some("pages"));
        assert!(report.pool.is_none());
    }

    #[tokio::test]
    async fn test_missing_index_macro() {
        let mut config = config();
        config.index_enabled = true;
        let store = MemoryStore::new();
        with_table(&store, &config);

        let report = evaluator(store, config).evaluate().await;
        assert_eq!(report.status, STATUS_UNHEALTHY);
        assert_eq!(report.http_status(), 503);

        let check = &report.checks["index_macro"];
        assert_eq!(check.status, CHECK_ERROR);
        assert_eq!(check.name.as_deref(), Some("render_index"));
        assert_eq!(check.error.as_deref(), Some(MACRO_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_all_macros_present() {
        let mut config = config();
        config.index_enabled = true;
        config.search_enabled = true;
        config.record_macro = Some("render_page".into());
        config.table_macro = Some("report".into());
        let store = MemoryStore::new();
        with_table(&store, &config);
        for name in ["render_index", "render_search", "render_page", "report"] {
            with_macro(&store, &config, name);
        }

        let report = evaluator(store, config).evaluate().await;
        assert!(report.is_healthy());
        assert_eq!(report.checks.len(), 6);
    }

    #[tokio::test]
    async fn test_database_failure_does_not_skip_other_checks() {
        let config = config();
        let store = MemoryStore::new();
        store.fail_ping("connection refused");
        store.respond(
            QueryBuilder::new(&config).table_probe(),
            Reply::Error("Catalog Error: Table pages does not exist".into()),
        );

        let report = evaluator(store, config).evaluate().await;
        assert!(!report.is_healthy());
        assert_eq!(
            report.checks["database"].error.as_deref(),
            Some("query failed: connection refused")
        );
        assert_eq!(report.checks["table"].status, CHECK_ERROR);
    }

    #[tokio::test]
    async fn test_detailed_report_includes_pool() {
        let mut config = config();
        config.health_detailed = true;
        let store = MemoryStore::new();
        store.fail_ping("down");
        let stats = PoolStats {
            open_connections: 3,
            in_use: 1,
            idle: 2,
        };
        store.set_pool_stats(stats);

        let report = evaluator(store, config).evaluate().await;
        // pool counters never change the verdict
        assert!(!report.is_healthy());
        assert_eq!(report.pool, Some(stats));
    }

    #[tokio::test]
    async fn test_report_json_shape() {
        let mut config = config();
        config.index_enabled = true;
        let store = MemoryStore::new();
        with_table(&store, &config);

        let report = evaluator(store, config).evaluate().await;
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["checks"]["database"]["status"], "ok");
        assert!(json["checks"]["database"].get("name").is_none());
        assert!(json["checks"]["database"].get("error").is_none());
        assert_eq!(json["checks"]["index_macro"]["error"], "macro not found");
        assert!(json.get("pool").is_none());
    }
}
