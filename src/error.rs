// src/error.rs
// Error taxonomy for the drift-routing engine

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Drift-routing error type
#[derive(Error, Debug)]
pub enum DriftError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("branch not found: {0}")]
    BranchNotFound(String),
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),
    #[error("pipeline timed out after {0}ms")]
    Timeout(u64),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DriftError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn branch_not_found(msg: impl Into<String>) -> Self {
        Self::BranchNotFound(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True when the underlying storage error is a unique-key violation,
    /// i.e. a conversation upsert race that should be swallowed, not surfaced.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
    }
}

impl From<sqlx::Error> for DriftError {
    fn from(err: sqlx::Error) -> Self {
        DriftError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for DriftError {
    fn from(err: reqwest::Error) -> Self {
        DriftError::Unavailable(err.to_string())
    }
}

pub type DriftResult<T> = Result<T, DriftError>;

impl IntoResponse for DriftError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            DriftError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DriftError::NotFound(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DriftError::BranchNotFound(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DriftError::Unavailable(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DriftError::Timeout(ms) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("pipeline timed out after {ms}ms"),
            ),
            DriftError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DriftError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        error!("request failed: {}", self);

        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": { "message": message }
            })),
        )
            .into_response()
    }
}
