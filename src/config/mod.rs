//! # Configuration
//!
//! JSON configuration for the server and the page handler. The handler
//! section is immutable once provisioned; re-provisioning builds a new
//! handler from a new `HandlerConfig`.
//!
//! ```json
//! {
//!   "server": { "port": 8080, "static_dir": "./public" },
//!   "handler": {
//!     "database_path": "site.duckdb",
//!     "table": "pages",
//!     "index_enabled": true,
//!     "search_enabled": true,
//!     "health_enabled": true
//!   }
//! }
//! ```

mod duration;
mod errors;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::store::StoreOptions;

pub use duration::parse_duration;
pub use errors::{ConfigError, ConfigResult};

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    pub handler: HandlerConfig,

    /// Minimum log severity: trace, info, warn, error (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let mut config: Config =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> ConfigResult<()> {
        self.severity()?;
        self.handler.validate()
    }

    /// The configured minimum log severity
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| ConfigError::invalid("log_level", e))
    }
}

/// Routing configuration for the page handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Database file; ":memory:" for an in-memory database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Table holding pre-rendered HTML (required)
    #[serde(default)]
    pub table: String,

    #[serde(default = "default_html_column")]
    pub html_column: String,

    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Query parameter carrying the record id. Unset: last path segment.
    #[serde(default)]
    pub id_param: Option<String>,

    /// Extra operator-supplied condition, appended as `AND (<clause>)`
    #[serde(default)]
    pub where_clause: Option<String>,

    /// Redirect target for missing records instead of a 404
    #[serde(default)]
    pub not_found_redirect: Option<String>,

    /// Cache-Control header for record responses
    #[serde(default)]
    pub cache_control: Option<String>,

    #[serde(default = "default_true")]
    pub read_only: bool,

    #[serde(default = "default_pool_size")]
    pub connection_pool_size: usize,

    /// Per-request store timeout, e.g. "5s", "500ms"; "0" disables
    #[serde(default = "default_query_timeout")]
    pub query_timeout: String,

    #[serde(default)]
    pub index_enabled: bool,

    #[serde(default = "default_index_macro")]
    pub index_macro: String,

    #[serde(default)]
    pub search_enabled: bool,

    #[serde(default = "default_search_macro")]
    pub search_macro: String,

    #[serde(default = "default_search_param")]
    pub search_param: String,

    /// Base path for routing and for links generated by macros.
    /// Unset: derived from the request path.
    #[serde(default)]
    pub base_path: String,

    /// SQL script executed once after the store is opened
    #[serde(default)]
    pub init_sql_file: Option<String>,

    /// Table macro rendering one record: `macro(id := '...')`
    #[serde(default)]
    pub record_macro: Option<String>,

    /// Table macro whose rows are rendered as a text grid
    #[serde(default)]
    pub table_macro: Option<String>,

    #[serde(default = "default_table_path")]
    pub table_path: String,

    #[serde(default)]
    pub health_enabled: bool,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Include connection pool counters in health responses
    #[serde(default)]
    pub health_detailed: bool,
}

fn default_database_path() -> String {
    ":memory:".to_string()
}
fn default_html_column() -> String {
    "html".to_string()
}
fn default_id_column() -> String {
    "id".to_string()
}
fn default_true() -> bool {
    true
}
fn default_pool_size() -> usize {
    10
}
fn default_query_timeout() -> String {
    "5s".to_string()
}
fn default_index_macro() -> String {
    "render_index".to_string()
}
fn default_search_macro() -> String {
    "render_search".to_string()
}
fn default_search_param() -> String {
    "q".to_string()
}
fn default_table_path() -> String {
    "_table".to_string()
}
fn default_health_path() -> String {
    "_health".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            table: String::new(),
            html_column: default_html_column(),
            id_column: default_id_column(),
            id_param: None,
            where_clause: None,
            not_found_redirect: None,
            cache_control: None,
            read_only: true,
            connection_pool_size: default_pool_size(),
            query_timeout: default_query_timeout(),
            index_enabled: false,
            index_macro: default_index_macro(),
            search_enabled: false,
            search_macro: default_search_macro(),
            search_param: default_search_param(),
            base_path: String::new(),
            init_sql_file: None,
            record_macro: None,
            table_macro: None,
            table_path: default_table_path(),
            health_enabled: false,
            health_path: default_health_path(),
            health_detailed: false,
        }
    }
}

impl HandlerConfig {
    /// Config for a table, with every other field defaulted
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Normalize empty values to their defaults and check required fields
    pub fn validate(&mut self) -> ConfigResult<()> {
        if self.table.trim().is_empty() {
            return Err(ConfigError::Missing("table"));
        }
        if self.connection_pool_size == 0 {
            return Err(ConfigError::invalid(
                "connection_pool_size",
                "must be greater than 0",
            ));
        }
        self.query_timeout()?;

        for optional in [
            &mut self.id_param,
            &mut self.where_clause,
            &mut self.not_found_redirect,
            &mut self.cache_control,
            &mut self.init_sql_file,
            &mut self.record_macro,
            &mut self.table_macro,
        ] {
            if optional.as_deref().map_or(false, |v| v.trim().is_empty()) {
                *optional = None;
            }
        }

        fill_default(&mut self.html_column, default_html_column);
        fill_default(&mut self.id_column, default_id_column);
        fill_default(&mut self.index_macro, default_index_macro);
        fill_default(&mut self.search_macro, default_search_macro);
        fill_default(&mut self.search_param, default_search_param);
        fill_default(&mut self.table_path, default_table_path);
        fill_default(&mut self.health_path, default_health_path);
        fill_default(&mut self.database_path, default_database_path);

        while self.base_path.ends_with('/') {
            self.base_path.pop();
        }

        Ok(())
    }

    /// Parsed `query_timeout`; `None` means unbounded
    pub fn query_timeout(&self) -> ConfigResult<Option<Duration>> {
        parse_duration(&self.query_timeout).map_err(|e| ConfigError::invalid("query_timeout", e))
    }

    /// `{base_path}/{health_path}`
    pub fn health_route(&self) -> String {
        format!("{}/{}", self.base_path, self.health_path)
    }

    /// `{base_path}/{table_path}`
    pub fn table_route(&self) -> String {
        format!("{}/{}", self.base_path, self.table_path)
    }

    /// Options for opening the backing store
    pub fn store_options(&self) -> ConfigResult<StoreOptions> {
        Ok(StoreOptions {
            database_path: self.database_path.clone(),
            read_only: self.read_only,
            pool_size: self.connection_pool_size,
            acquire_timeout: self.query_timeout()?,
        })
    }
}

fn fill_default(value: &mut String, default: fn() -> String) {
    if value.trim().is_empty() {
        *value = default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_json(r#"{"handler": {"table": "pages"}}"#).unwrap();
        let handler = &config.handler;

        assert_eq!(handler.database_path, ":memory:");
        assert_eq!(handler.html_column, "html");
        assert_eq!(handler.id_column, "id");
        assert!(handler.read_only);
        assert_eq!(handler.connection_pool_size, 10);
        assert_eq!(
            handler.query_timeout().unwrap(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(handler.index_macro, "render_index");
        assert_eq!(handler.search_macro, "render_search");
        assert_eq!(handler.search_param, "q");
        assert_eq!(handler.health_route(), "/_health");
        assert_eq!(handler.table_route(), "/_table");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_table_required() {
        let err = Config::from_json(r#"{"handler": {}}"#).unwrap_err();
        assert_eq!(err, ConfigError::Missing("table"));

        let err = Config::from_json(r#"{"handler": {"table": "  "}}"#).unwrap_err();
        assert_eq!(err, ConfigError::Missing("table"));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = Config::from_json(r#"{"handler": {"table": "t", "query_timeout": "soon"}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "query_timeout", .. }));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let err =
            Config::from_json(r#"{"handler": {"table": "t", "connection_pool_size": 0}}"#)
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "connection_pool_size", .. }));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_json(r#"{"handler": {"table": "t"}, "log_level": "chatty"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "log_level", .. }));
    }

    #[test]
    fn test_empty_optionals_become_unset() {
        let config = Config::from_json(
            r#"{"handler": {"table": "t", "record_macro": "", "table_macro": " ",
                "init_sql_file": "", "health_path": "", "base_path": "/site/"}}"#,
        )
        .unwrap();

        assert_eq!(config.handler.record_macro, None);
        assert_eq!(config.handler.table_macro, None);
        assert_eq!(config.handler.init_sql_file, None);
        assert_eq!(config.handler.health_path, "_health");
        assert_eq!(config.handler.base_path, "/site");
        assert_eq!(config.handler.health_route(), "/site/_health");
    }

    #[test]
    fn test_parse_error_reported() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/duckpage.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_store_options() {
        let mut handler = HandlerConfig::for_table("pages");
        handler.database_path = "site.duckdb".to_string();
        handler.connection_pool_size = 4;
        handler.query_timeout = "0".to_string();
        handler.validate().unwrap();

        let options = handler.store_options().unwrap();
        assert_eq!(options.database_path, "site.duckdb");
        assert!(options.read_only);
        assert_eq!(options.pool_size, 4);
        assert_eq!(options.acquire_timeout, None);
    }
}
