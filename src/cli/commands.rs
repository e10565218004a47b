//! CLI command implementations
//!
//! `serve` provisions in a fixed order and binds only after every step
//! succeeded:
//!
//! 1. Configuration load and validation
//! 2. Store open
//! 3. Store ping
//! 4. Init script, statement by statement
//! 5. Router construction
//! 6. Bind and serve

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::config::Config;
use crate::handler::PageHandler;
use crate::http_server::HttpServer;
use crate::observability::{log_event, log_event_with_fields, Event, Logger, ObservationScope};
use crate::script::{load_script, run_script, truncate_for_log};
use crate::store::{CancelToken, Store, StoreOptions};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_json_line;

/// Statement text length printed by `check-init`
const CHECK_STATEMENT_CHARS: usize = 200;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a parsed command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::CheckInit { file } => check_init(&file, &mut io::stdout()),
    }
}

/// Provision and serve until the process is stopped
pub fn serve(config_path: &Path) -> CliResult<()> {
    let path = config_path.display().to_string();
    log_event_with_fields(Event::StartupBegin, &[("config", path.as_str())]);

    let server = match provision(config_path) {
        Ok(server) => server,
        Err(e) => {
            log_event_with_fields(
                Event::StartupFailed,
                &[("code", e.code()), ("reason", e.to_string().as_str())],
            );
            return Err(e);
        }
    };

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::startup("runtime", format!("Failed to create tokio runtime: {}", e)))?;

    let addr = server.socket_addr();
    log_event_with_fields(Event::StartupComplete, &[("addr", addr.as_str())]);

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::startup("serve", format!("HTTP server failed: {}", e)))
    })
}

/// Steps 1 to 5: everything before the listener is bound
fn provision(config_path: &Path) -> CliResult<HttpServer> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("table", config.handler.table.as_str()),
            ("database", config.handler.database_path.as_str()),
        ],
    );

    let store = open_store(&config.handler.store_options()?)?;
    let handler = provision_handler(&config, store)?;

    Ok(HttpServer::new(config.server.clone(), Arc::new(handler)))
}

/// Steps 3 to 5 against an already opened store
pub fn provision_handler(config: &Config, store: Arc<dyn Store>) -> CliResult<PageHandler> {
    store
        .ping(&CancelToken::new())
        .map_err(|e| CliError::startup("store_ping", e.to_string()))?;
    log_event(Event::StoreOpened);

    if let Some(init_file) = &config.handler.init_sql_file {
        let statements = load_script(Path::new(init_file))?;
        run_script(store.as_ref(), &statements)?;
    }

    Ok(PageHandler::new(config.handler.clone(), store)?)
}

#[cfg(feature = "duckdb")]
fn open_store(options: &StoreOptions) -> CliResult<Arc<dyn Store>> {
    let scope = ObservationScope::with_fields(
        "STORE_OPEN",
        &[("database", options.database_path.as_str())],
    );
    match crate::store::DuckDbStore::open(options) {
        Ok(store) => {
            scope.complete();
            Ok(Arc::new(store))
        }
        Err(e) => {
            scope.fail(&e.to_string());
            Err(CliError::startup("store_open", e.to_string()))
        }
    }
}

#[cfg(not(feature = "duckdb"))]
fn open_store(options: &StoreOptions) -> CliResult<Arc<dyn Store>> {
    let scope = ObservationScope::with_fields(
        "STORE_OPEN",
        &[("database", options.database_path.as_str())],
    );
    let reason = "built without the `duckdb` feature; rebuild with --features duckdb";
    scope.fail(reason);
    Err(CliError::startup("store_open", reason))
}

/// Print the statements of an init script as JSON lines without running them
pub fn check_init<W: io::Write>(file: &Path, out: &mut W) -> CliResult<()> {
    let statements = load_script(file).map_err(|e| CliError::Io(e.to_string()))?;

    for statement in &statements {
        write_json_line(
            out,
            &json!({
                "index": statement.index,
                "statement": truncate_for_log(&statement.text, CHECK_STATEMENT_CHARS),
            }),
        )?;
    }
    write_json_line(out, &json!({ "statements": statements.len() }))
}
