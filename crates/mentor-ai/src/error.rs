//! Error types for the Mentor AI service

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for Mentor AI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Mentor AI errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Remote site answered with a non-success status
    #[error("Failed to retrieve '{url}': HTTP {status}")]
    Upstream { url: String, status: u16, body: String },

    /// Remote site could not be reached
    #[error("Could not fetch URL '{url}': {message}")]
    Fetch { url: String, message: String },

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Database not reachable (health checks)
    #[error("DB not connected")]
    DbUnavailable,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::Validation(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Error::Fetch { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Llm(_) | Error::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Validation(_) => "validation_error",
            Error::NotFound { .. } => "not_found",
            Error::Upstream { .. } => "upstream_error",
            Error::Fetch { .. } => "fetch_error",
            Error::Llm(_) => "llm_error",
            Error::Database(_) => "database_error",
            Error::DbUnavailable => "db_unavailable",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Upstream bodies can be whole HTML pages
            Error::Upstream { body, .. } => {
                let snippet: String = body.chars().take(200).collect();
                format!("{}: {}", self, snippet)
            }
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("{} -> {}", status, message);
        }

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
