//! Request classification.
//!
//! [`classify`] is a pure function of the configuration and the request:
//! it picks exactly one route, in fixed precedence, before any SQL is
//! built.

use axum::extract::Query;
use axum::http::{Method, Uri};
use percent_encoding::percent_decode_str;

use crate::config::HandlerConfig;

use super::errors::{HandlerError, HandlerResult};

/// Query parameter carrying the index page number
pub const PAGE_PARAM: &str = "page";

/// The single route a request maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    HealthCheck,
    TabularReport,
    Search { term: String },
    Index { page: u32 },
    RecordLookup { id: String },
    /// Not ours; hand the request to the next handler
    PassThrough,
}

impl RouteDecision {
    /// Short name used in request logs
    pub fn category(&self) -> &'static str {
        match self {
            RouteDecision::HealthCheck => "health",
            RouteDecision::TabularReport => "table",
            RouteDecision::Search { .. } => "search",
            RouteDecision::Index { .. } => "index",
            RouteDecision::RecordLookup { .. } => "record",
            RouteDecision::PassThrough => "pass",
        }
    }
}

/// The parts of a request routing looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestView {
    pub method: Method,
    pub path: String,
    /// Query parameters in request order, repeats included
    pub query: Vec<(String, String)>,
}

impl RequestView {
    pub fn new(method: Method, uri: &Uri) -> Self {
        let query = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        Self {
            method,
            path: uri.path().to_string(),
            query,
        }
    }

    /// First value of a query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First value of a query parameter, ignoring empty values
    fn non_empty_param(&self, name: &str) -> Option<&str> {
        self.param(name).filter(|value| !value.is_empty())
    }
}

/// Pick the route for a request.
///
/// Precedence: health, tabular report, search, index, record lookup.
/// A request with no identifier is an index request when the index is
/// enabled and a validation error otherwise.
pub fn classify(config: &HandlerConfig, request: &RequestView) -> HandlerResult<RouteDecision> {
    if request.method != Method::GET && request.method != Method::HEAD {
        return Ok(RouteDecision::PassThrough);
    }

    let path = request.path.as_str();
    if !within_base_path(&config.base_path, path) {
        return Ok(RouteDecision::PassThrough);
    }

    if config.health_enabled && path == config.health_route() {
        return Ok(RouteDecision::HealthCheck);
    }

    if config.table_macro.is_some() && path.starts_with(&config.table_route()) {
        return Ok(RouteDecision::TabularReport);
    }

    if config.search_enabled {
        if let Some(term) = request.non_empty_param(&config.search_param) {
            return Ok(RouteDecision::Search {
                term: term.to_string(),
            });
        }
    }

    match record_id(config, request) {
        Some(id) => Ok(RouteDecision::RecordLookup { id }),
        None if config.index_enabled => Ok(RouteDecision::Index {
            page: page_number(request.param(PAGE_PARAM)),
        }),
        None => Err(HandlerError::missing_id()),
    }
}

fn within_base_path(base_path: &str, path: &str) -> bool {
    if base_path.is_empty() {
        return true;
    }
    match path.strip_prefix(base_path) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Identifier from the configured query parameter, else the last path
/// segment. A path ending in `/` carries no identifier.
fn record_id(config: &HandlerConfig, request: &RequestView) -> Option<String> {
    if let Some(param) = &config.id_param {
        return request.non_empty_param(param).map(str::to_string);
    }

    let relative = request
        .path
        .strip_prefix(config.base_path.as_str())
        .unwrap_or(request.path.as_str());
    if relative.is_empty() || relative.ends_with('/') {
        return None;
    }

    let segment = relative.rsplit('/').next()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}

/// Positive page number; anything else, padded digits included, is page 1
pub fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.parse::<u32>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

/// Base path passed to index and table macros
pub fn request_base_path(config: &HandlerConfig, path: &str) -> String {
    if !config.base_path.is_empty() {
        return config.base_path.clone();
    }
    path.strip_suffix('/').unwrap_or(path).to_string()
}

/// Base path passed to the search macro; a trailing `/search` is dropped
pub fn search_base_path(config: &HandlerConfig, path: &str) -> String {
    if !config.base_path.is_empty() {
        return config.base_path.clone();
    }
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed.strip_suffix("/search").unwrap_or(trimmed).to_string()
}
