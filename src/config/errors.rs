//! Configuration errors

use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors are always fatal at provisioning time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {message}")]
    Read { path: String, message: String },

    /// Config file is not valid JSON for the schema
    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A required field is missing or empty
    #[error("{0} is required")]
    Missing(&'static str),

    /// A field has an unusable value
    #[error("Invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}
