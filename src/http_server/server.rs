//! # HTTP Server
//!
//! One axum router: the page handler runs as middleware in front of the
//! fallback, which is either a static directory or a plain 404.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use super::config::HttpServerConfig;
use crate::handler::{page_middleware, PageHandler};
use crate::observability::{log_event_with_fields, Event};

/// HTTP server for one page handler
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, handler: Arc<PageHandler>) -> Self {
        let router = Self::build_router(&config, handler);
        Self { config, router }
    }

    /// Build the router with the page handler in front of the fallback
    pub fn build_router(config: &HttpServerConfig, handler: Arc<PageHandler>) -> Router {
        let router = match &config.static_dir {
            Some(dir) => Router::new().fallback_service(ServeDir::new(dir)),
            None => Router::new().fallback(|| async { StatusCode::NOT_FOUND }),
        };

        router.layer(from_fn_with_state(handler, page_middleware))
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process exits
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid listen address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?.to_string();
        log_event_with_fields(Event::Serving, &[("addr", local.as_str())]);

        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
