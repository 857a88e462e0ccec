/// Unified error types for the VidStream account backend
use crate::response::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or an invalid/stale token
    #[error("{0}")]
    Auth(String),

    /// No matching account or channel
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation (e.g. duplicate username/email)
    #[error("{0}")]
    Conflict(String),

    /// Internal server errors (hashing, signing, persistence setup)
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert ApiError to the standard response envelope
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal detail past the boundary
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        ApiResponse::new(status, serde_json::Value::Null, message).into_response()
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;
