//! Init script errors

use thiserror::Error;

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Init script failures. Both abort provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("Failed to read init script {path}: {message}")]
    Read { path: String, message: String },

    /// `statement` is whitespace-normalized and truncated
    #[error("Init statement {index} failed: {message} (statement: {statement})")]
    Statement {
        index: usize,
        statement: String,
        message: String,
    },
}

impl ScriptError {
    /// 1-based index of the failing statement, if any
    pub fn statement_index(&self) -> Option<usize> {
        match self {
            Self::Statement { index, .. } => Some(*index),
            Self::Read { .. } => None,
        }
    }
}
