use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::repository::RepositoryError;

/// Failure taxonomy for every intake workflow operation.
///
/// All variants except `Repository` are detected before any mutation is attempted.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{entity} not found: {}", .ids.join(", "))]
    NotFound {
        entity: &'static str,
        ids: Vec<String>,
    },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("bulk request contains malformed ids alongside valid ones ({} rejected)", .invalid.len())]
    PartialInput { invalid: Vec<String> },
    #[error("missing actor identity")]
    Unauthenticated,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            ids: vec![id.to_string()],
        }
    }

    /// Stable machine-readable tag for responses and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::Forbidden(_) => "forbidden",
            WorkflowError::InvalidTransition { .. } => "invalid_transition",
            WorkflowError::Validation(_) => "validation_error",
            WorkflowError::PartialInput { .. } => "partial_input_error",
            WorkflowError::Unauthenticated => "unauthenticated",
            WorkflowError::Repository(RepositoryError::Conflict) => "conflict",
            WorkflowError::Repository(RepositoryError::NotFound)
            | WorkflowError::Repository(RepositoryError::Missing(_)) => "not_found",
            WorkflowError::Repository(RepositoryError::Unavailable(_)) => "unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::Validation(_)
            | WorkflowError::PartialInput { .. } => StatusCode::BAD_REQUEST,
            WorkflowError::Unauthenticated => StatusCode::UNAUTHORIZED,
            WorkflowError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            WorkflowError::Repository(RepositoryError::NotFound)
            | WorkflowError::Repository(RepositoryError::Missing(_)) => StatusCode::NOT_FOUND,
            WorkflowError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}
