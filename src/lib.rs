//! duckpage - serve HTML rendered by SQL table macros
//!
//! Requests are mapped onto lookups and macro calls against an embedded
//! analytical store; rendering happens inside the store.

pub mod cache;
pub mod cli;
pub mod config;
pub mod handler;
pub mod health;
pub mod http_server;
pub mod observability;
pub mod script;
pub mod sql;
pub mod store;
pub mod table;
