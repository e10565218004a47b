//! # Handler errors
//!
//! Every store failure is translated into one of these at the handler
//! boundary. Upstream details are logged, never sent to the client.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

pub type HandlerResult<T> = Result<T, HandlerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Required routing input is absent and no fallback route applies
    #[error("{0}")]
    Validation(String),

    /// The lookup returned no row
    #[error("content not found")]
    NotFound {
        /// Configured redirect target, answered with 302 instead of 404
        redirect: Option<String>,
    },

    /// The store failed, timed out or was cancelled
    #[error("upstream error: {0}")]
    Upstream(#[from] StoreError),
}

impl HandlerError {
    pub fn missing_id() -> Self {
        Self::Validation("missing ID parameter".to_string())
    }

    pub fn not_found() -> Self {
        Self::NotFound { redirect: None }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::Validation(_) => StatusCode::BAD_REQUEST,
            HandlerError::NotFound { redirect: Some(_) } => StatusCode::FOUND,
            HandlerError::NotFound { redirect: None } => StatusCode::NOT_FOUND,
            HandlerError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client
    pub fn public_message(&self) -> String {
        match self {
            HandlerError::Upstream(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        if let HandlerError::NotFound {
            redirect: Some(location),
        } = &self
        {
            return (StatusCode::FOUND, [(header::LOCATION, location.clone())]).into_response();
        }

        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.public_message(),
            code: status.as_u16(),
        });
        (status, body).into_response()
    }
}
