//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lookalike_pipeline::PipelineError;
use lookalike_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Pipeline(e) => match e {
                PipelineError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                PipelineError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
                PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                e if e.is_config() => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Whether the message may carry upstream or configuration details.
    fn is_sensitive(&self) -> bool {
        match self {
            ApiError::Internal(_) => true,
            ApiError::Pipeline(e) => !matches!(
                e,
                PipelineError::Cancelled | PipelineError::Storage(StorageError::NotFound(_))
            ),
            _ => false,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        }

        // Don't expose upstream error details in production
        let detail = if self.is_sensitive()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
