//! # Init script
//!
//! The init script runs once at provisioning, before the listener is
//! bound. It typically installs extensions, creates macros and loads
//! tables. Any failing statement aborts startup.

mod errors;
mod parser;
mod runner;

pub use errors::{ScriptError, ScriptResult};
pub use parser::{parse_statements, truncate_for_log, ScriptStatement};
pub use runner::{load_script, run_script};
