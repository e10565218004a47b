//! CLI module for duckpage
//!
//! Provides command-line interface for:
//! - serve: Provision the store and serve pages
//! - check-init: Print the statements of an init script

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_init, provision_handler, run, run_command, serve};
pub use errors::{CliError, CliResult};
