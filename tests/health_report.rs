//! Health Report Tests
//!
//! The health endpoint through the router: status codes, JSON shape and
//! cache headers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use duckpage::config::HandlerConfig;
use duckpage::handler::{PageHandler, HEALTH_CACHE_CONTROL};
use duckpage::http_server::{HttpServer, HttpServerConfig};
use duckpage::sql::QueryBuilder;
use duckpage::store::{MemoryStore, PoolStats, Reply};

fn config() -> HandlerConfig {
    let mut config = HandlerConfig::for_table("pages");
    config.health_enabled = true;
    config.base_path = "/site".to_string();
    config.validate().unwrap();
    config
}

fn router(config: HandlerConfig, store: MemoryStore) -> Router {
    let handler = PageHandler::new(config, Arc::new(store)).unwrap();
    HttpServer::build_router(&HttpServerConfig::default(), Arc::new(handler))
}

async fn health(router: &Router) -> (StatusCode, String, Value) {
    let request = Request::builder()
        .uri("/site/_health")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cache_control = response.headers()[header::CACHE_CONTROL]
        .to_str()
        .unwrap()
        .to_string();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, cache_control, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_healthy_report() {
    let config = config();
    let store = MemoryStore::new();
    store.respond(QueryBuilder::new(&config).table_probe(), Reply::Text("1".into()));
    let router = router(config, store);

    let (status, cache_control, json) = health(&router).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_control, HEALTH_CACHE_CONTROL);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["database"]["status"], "ok");
    assert_eq!(json["checks"]["table"]["name"], "pages");
    assert!(json.get("pool").is_none());
}

#[tokio::test]
async fn test_missing_index_macro_is_unhealthy() {
    let mut config = config();
    config.index_enabled = true;
    let store = MemoryStore::new();
    store.respond(QueryBuilder::new(&config).table_probe(), Reply::Text("1".into()));
    let router = router(config, store);

    let (status, _, json) = health(&router).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["checks"]["index_macro"]["status"], "error");
    assert_eq!(json["checks"]["index_macro"]["error"], "macro not found");
    assert_eq!(json["checks"]["table"]["status"], "ok");
}

#[tokio::test]
async fn test_detailed_report_has_pool_counters() {
    let mut config = config();
    config.health_detailed = true;
    let store = MemoryStore::new();
    store.respond(QueryBuilder::new(&config).table_probe(), Reply::Text("1".into()));
    store.set_pool_stats(PoolStats {
        open_connections: 4,
        in_use: 1,
        idle: 3,
    });
    let router = router(config, store);

    let (status, _, json) = health(&router).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pool"]["open_connections"], 4);
    assert_eq!(json["pool"]["in_use"], 1);
    assert_eq!(json["pool"]["idle"], 3);
}

#[tokio::test]
async fn test_missing_table_is_unhealthy() {
    let config = config();
    let store = MemoryStore::new();
    store.respond(
        QueryBuilder::new(&config).table_probe(),
        Reply::Error("Catalog Error: Table with name pages does not exist!".into()),
    );
    let router = router(config, store);

    let (status, _, json) = health(&router).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["checks"]["table"]["status"], "error");
    assert!(json["checks"]["table"]["error"]
        .as_str()
        .unwrap()
        .contains("does not exist"));
}
