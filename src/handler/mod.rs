//! # Page handler
//!
//! Classifies each request, runs the one query its route needs and shapes
//! the response. Requests that are not ours go to the next handler.
//!
//! | Route        | Cache-Control                          | Conditional |
//! |--------------|----------------------------------------|-------------|
//! | record       | configured `cache_control`, if any     | yes         |
//! | index        | `no-cache`                             | no          |
//! | search       | `no-cache`                             | no          |
//! | table report | `no-cache`                             | no          |
//! | health       | `no-cache, no-store, must-revalidate`  | no          |

mod errors;
mod route;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::cache::ContentResult;
use crate::config::{ConfigResult, HandlerConfig};
use crate::health::HealthEvaluator;
use crate::observability::{Event, Logger, Severity, Timer};
use crate::sql::{QueryBuilder, SqlQuery};
use crate::store::{run_blocking, ResultSet, Store};
use crate::table::format_table;

pub use errors::{ErrorResponse, HandlerError, HandlerResult};
pub use route::{
    classify, page_number, request_base_path, search_base_path, RequestView, RouteDecision,
    PAGE_PARAM,
};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const NO_CACHE: &str = "no-cache";
pub const HEALTH_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// Serves pages out of the store for one configuration
pub struct PageHandler {
    config: Arc<HandlerConfig>,
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
    health: HealthEvaluator,
}

impl PageHandler {
    /// `config` must already be validated
    pub fn new(config: HandlerConfig, store: Arc<dyn Store>) -> ConfigResult<Self> {
        let timeout = config.query_timeout()?;
        let config = Arc::new(config);
        let health = HealthEvaluator::new(Arc::clone(&store), Arc::clone(&config), timeout);
        Ok(Self {
            config,
            store,
            timeout,
            health,
        })
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Handle a request, or return `None` to pass it on
    pub async fn handle(&self, request: &RequestView, if_none_match: Option<&str>) -> Option<Response> {
        let timer = Timer::new();
        let request_id = Uuid::new_v4().to_string();

        let (category, outcome) = match classify(&self.config, request) {
            Ok(RouteDecision::PassThrough) => {
                Logger::trace(
                    Event::RequestPassed.as_str(),
                    &[("method", request.method.as_str()), ("path", request.path.as_str())],
                );
                return None;
            }
            Ok(decision) => {
                let category = decision.category();
                let outcome = self
                    .dispatch(decision, request, if_none_match, &request_id)
                    .await;
                (category, outcome)
            }
            // only a record lookup can lack its identifier
            Err(e) => ("record", Err(e)),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                if let HandlerError::Upstream(cause) = &e {
                    Logger::error(
                        Event::UpstreamFailed.as_str(),
                        &[
                            ("request_id", request_id.as_str()),
                            ("route", category),
                            ("error", cause.to_string().as_str()),
                        ],
                    );
                }
                e.into_response()
            }
        };

        let status = response.status().as_u16().to_string();
        let elapsed = timer.elapsed_ms();
        Logger::info(
            Event::RequestServed.as_str(),
            &[
                ("request_id", request_id.as_str()),
                ("method", request.method.as_str()),
                ("path", request.path.as_str()),
                ("route", category),
                ("status", status.as_str()),
                ("elapsed_ms", elapsed.as_str()),
            ],
        );

        if request.method == Method::HEAD {
            Some(without_body(response))
        } else {
            Some(response)
        }
    }

    async fn dispatch(
        &self,
        decision: RouteDecision,
        request: &RequestView,
        if_none_match: Option<&str>,
        request_id: &str,
    ) -> HandlerResult<Response> {
        let builder = QueryBuilder::new(&self.config);

        match decision {
            RouteDecision::HealthCheck => Ok(self.serve_health().await),
            RouteDecision::TabularReport => {
                let base_path = request_base_path(&self.config, &request.path);
                let query = builder.table_report(&request.query, &base_path);
                let result = self.fetch_table(request_id, query).await?;
                Ok(html_response(format_table(&result).into_bytes(), None, Some(NO_CACHE)))
            }
            RouteDecision::Search { term } => {
                let base_path = search_base_path(&self.config, &request.path);
                let query = builder.search(&term, &base_path);
                let html = self
                    .fetch_text(request_id, query)
                    .await?
                    .ok_or_else(HandlerError::not_found)?;
                Ok(html_response(html.into_bytes(), None, Some(NO_CACHE)))
            }
            RouteDecision::Index { page } => {
                let base_path = request_base_path(&self.config, &request.path);
                let query = builder.index(page, &base_path);
                let html = self
                    .fetch_text(request_id, query)
                    .await?
                    .ok_or_else(HandlerError::not_found)?;
                Ok(html_response(html.into_bytes(), None, Some(NO_CACHE)))
            }
            RouteDecision::RecordLookup { id } => {
                let query = builder.record(&id);
                let html = self.fetch_text(request_id, query).await?.ok_or_else(|| {
                    HandlerError::NotFound {
                        redirect: self.config.not_found_redirect.clone(),
                    }
                })?;

                let content = ContentResult::new(html.into_bytes());
                if content.is_not_modified(if_none_match) {
                    return Ok(not_modified(&content.fingerprint));
                }
                Ok(html_response(
                    content.bytes,
                    Some(&content.fingerprint),
                    self.config.cache_control.as_deref(),
                ))
            }
            RouteDecision::PassThrough => Err(HandlerError::not_found()),
        }
    }

    async fn serve_health(&self) -> Response {
        let report = self.health.evaluate().await;
        Logger::info(Event::HealthReported.as_str(), &[("status", report.status)]);

        let status =
            StatusCode::from_u16(report.http_status()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        (
            status,
            [(CACHE_CONTROL, HeaderValue::from_static(HEALTH_CACHE_CONTROL))],
            Json(report),
        )
            .into_response()
    }

    async fn fetch_text(&self, request_id: &str, query: SqlQuery) -> HandlerResult<Option<String>> {
        self.log_query(request_id, &query);
        let html = run_blocking(Arc::clone(&self.store), self.timeout, move |store, cancel| {
            store.fetch_text(&query, cancel)
        })
        .await?;
        Ok(html)
    }

    async fn fetch_table(&self, request_id: &str, query: SqlQuery) -> HandlerResult<ResultSet> {
        self.log_query(request_id, &query);
        let result = run_blocking(Arc::clone(&self.store), self.timeout, move |store, cancel| {
            store.fetch_table(&query, cancel)
        })
        .await?;
        Ok(result)
    }

    fn log_query(&self, request_id: &str, query: &SqlQuery) {
        if !Logger::enabled(Severity::Trace) {
            return;
        }
        let params = query.params.join(",");
        Logger::trace(
            Event::QueryIssued.as_str(),
            &[
                ("request_id", request_id),
                ("sql", query.text.as_str()),
                ("params", params.as_str()),
            ],
        );
    }
}

/// Middleware entry point; `next` receives everything we pass through
pub async fn page_middleware(
    State(handler): State<Arc<PageHandler>>,
    request: Request,
    next: Next,
) -> Response {
    let view = RequestView::new(request.method().clone(), request.uri());
    let if_none_match = request
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match handler.handle(&view, if_none_match.as_deref()).await {
        Some(response) => response,
        None => next.run(request).await,
    }
}

fn html_response(body: Vec<u8>, etag: Option<&str>, cache_control: Option<&str>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    if let Some(value) = etag.and_then(|tag| HeaderValue::from_str(tag).ok()) {
        headers.insert(ETAG, value);
    }
    if let Some(value) = cache_control.and_then(|cc| HeaderValue::from_str(cc).ok()) {
        headers.insert(CACHE_CONTROL, value);
    }
    (StatusCode::OK, headers, Body::from(body)).into_response()
}

fn not_modified(fingerprint: &str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(fingerprint) {
        headers.insert(ETAG, value);
    }
    (StatusCode::NOT_MODIFIED, headers).into_response()
}

fn without_body(response: Response) -> Response {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::empty())
}
