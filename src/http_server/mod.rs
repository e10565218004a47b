//! # HTTP Server Module
//!
//! Binds the listener and wires the page handler into an axum router.
//! Requests the handler does not claim fall through to the static
//! directory, if one is configured.

pub mod config;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
