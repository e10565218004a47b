//! Sequential init script execution

use std::fs;
use std::path::Path;

use crate::observability::{Event, Logger, ObservationScope};
use crate::sql::SqlQuery;
use crate::store::{CancelToken, Store};

use super::errors::{ScriptError, ScriptResult};
use super::parser::{parse_statements, truncate_for_log, ScriptStatement};

/// Statement text length in trace logs
const LOG_STATEMENT_CHARS: usize = 100;

/// Statement text length in error reports
const ERROR_STATEMENT_CHARS: usize = 200;

/// Read and split an init script
pub fn load_script(path: &Path) -> ScriptResult<Vec<ScriptStatement>> {
    let content = fs::read_to_string(path).map_err(|e| ScriptError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(parse_statements(&content))
}

/// Run statements strictly in order, stopping at the first failure.
///
/// Returns the number of statements executed. Startup has no deadline, so
/// the statements run under a token that is never cancelled.
pub fn run_script(store: &dyn Store, statements: &[ScriptStatement]) -> ScriptResult<usize> {
    let cancel = CancelToken::new();
    let total = statements.len().to_string();
    let scope = ObservationScope::with_fields("INIT_SCRIPT", &[("statements", total.as_str())]);

    for statement in statements {
        let index = statement.index.to_string();
        let preview = truncate_for_log(&statement.text, LOG_STATEMENT_CHARS);
        Logger::trace(
            Event::InitStatement.as_str(),
            &[("index", index.as_str()), ("statement", preview.as_str())],
        );

        if let Err(e) = store.execute(&SqlQuery::new(statement.text.as_str()), &cancel) {
            let error = ScriptError::Statement {
                index: statement.index,
                statement: truncate_for_log(&statement.text, ERROR_STATEMENT_CHARS),
                message: e.to_string(),
            };
            scope.fail(&error.to_string());
            return Err(error);
        }
    }

    scope.complete();
    Ok(statements.len())
}
