//! CLI-specific error types
//!
//! Every CLI error is fatal: the process exits non-zero and nothing is
//! served.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::script::ScriptError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error("DUCKPAGE_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// Provisioning failed before the listener was bound
    #[error("DUCKPAGE_STARTUP_FAILED: {stage}: {message}")]
    Startup {
        stage: &'static str,
        /// 1-based index of the failing init statement
        statement_index: Option<usize>,
        message: String,
    },

    /// Script read failure or stdout write failure
    #[error("DUCKPAGE_CLI_IO_ERROR: {0}")]
    Io(String),
}

impl CliError {
    const CONFIG: &'static str = "DUCKPAGE_CLI_CONFIG_ERROR";
    const STARTUP: &'static str = "DUCKPAGE_STARTUP_FAILED";
    const IO: &'static str = "DUCKPAGE_CLI_IO_ERROR";

    pub fn startup(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Startup {
            stage,
            statement_index: None,
            message: message.into(),
        }
    }

    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => Self::CONFIG,
            Self::Startup { .. } => Self::STARTUP,
            Self::Io(_) => Self::IO,
        }
    }
}

impl From<ScriptError> for CliError {
    fn from(e: ScriptError) -> Self {
        Self::Startup {
            stage: "init_script",
            statement_index: e.statement_index(),
            message: e.to_string(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::Io(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_keeps_index() {
        let err = CliError::from(ScriptError::Statement {
            index: 3,
            statement: "LOAD nope".into(),
            message: "extension not found".into(),
        });
        match &err {
            CliError::Startup {
                stage,
                statement_index,
                ..
            } => {
                assert_eq!(*stage, "init_script");
                assert_eq!(*statement_index, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("DUCKPAGE_STARTUP_FAILED: init_script: "));
        assert_eq!(err.code(), "DUCKPAGE_STARTUP_FAILED");
    }

    #[test]
    fn test_config_error_code() {
        let err = CliError::from(ConfigError::Missing("table"));
        assert_eq!(err.code(), "DUCKPAGE_CLI_CONFIG_ERROR");
        assert_eq!(
            err.to_string(),
            "DUCKPAGE_CLI_CONFIG_ERROR: table is required"
        );
    }
}
