use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::dispatcher::PipelineError;
use crate::pipeline::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested stage action no longer applies to the pipeline's state.
    #[error("Action unavailable: {0}")]
    ActionUnavailable(String),

    #[error("Concurrent modification")]
    ConcurrentModification,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidStage { .. } | PipelineError::TerminalState(_) => {
                AppError::ActionUnavailable(err.to_string())
            }
            PipelineError::NotFound(id) => AppError::NotFound(format!("Pipeline {id} not found")),
            PipelineError::ConcurrentModification => AppError::ConcurrentModification,
            PipelineError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Duplicate { .. } => AppError::Conflict(err.to_string()),
            StoreError::Corrupt(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::ActionUnavailable(detail) => {
                tracing::info!("Rejected pipeline action: {detail}");
                (
                    StatusCode::CONFLICT,
                    "ACTION_UNAVAILABLE",
                    "This action is no longer available".to_string(),
                )
            }
            AppError::ConcurrentModification => (
                StatusCode::CONFLICT,
                "CONCURRENT_MODIFICATION",
                "Please refresh and retry".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
