//! Typed errors for each component.
//!
//! Library code returns these `thiserror` types; the CLI and HTTP
//! boundaries convert them into process exit codes / structured JSON
//! responses respectively.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("task {0} not found")]
    NotFound(String),
    #[error("task {task_id} is not locked by {agent_id} (status={status}, locked_by={locked_by:?})")]
    NotOwner {
        task_id: String,
        agent_id: String,
        status: String,
        locked_by: Option<String>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("command timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("command failed with status {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("command timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("command failed with status {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("no roles configured")]
    NoRolesConfigured,
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config not found at {0}")]
    NotFound(String),
    #[error("invalid config: {0:?}")]
    Invalid(Vec<String>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Maps a [`FleetError`] onto the HTTP boundary: unknown agent → 404,
/// invalid identifier → 400, everything else → 500 carrying the error
/// message as a report rather than a crash.
impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let status = match &self {
            FleetError::UnknownAgent(_) => StatusCode::NOT_FOUND,
            FleetError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let status = match &self {
            BoardError::NotFound(_) => StatusCode::NOT_FOUND,
            BoardError::NotOwner { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl IntoResponse for ConfigError {
    fn into_response(self) -> Response {
        let status = match &self {
            ConfigError::NotFound(_) => StatusCode::NOT_FOUND,
            ConfigError::Invalid(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl IntoResponse for LockError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl IntoResponse for RuntimeError {
    fn into_response(self) -> Response {
        let status = match &self {
            RuntimeError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
