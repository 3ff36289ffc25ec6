//! API error type with structured JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::db::StorageError;
use crate::relay::RelayError;

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Map a storage failure to a generic 500. The cause is logged, never
    /// returned to the client.
    pub fn storage(public_message: &str, err: &StorageError) -> Self {
        error!(error = %err, "{public_message}");
        Self::Internal(public_message.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Human-readable message without the category prefix.
    fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) | Self::BadRequest(msg) | Self::Internal(msg) => msg,
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        match &self {
            ApiError::Internal(msg) => {
                error!(error_code = code, message = %msg, "API error");
            }
            _ => {
                debug!(error_code = code, message = %self, "Client error");
            }
        }

        let body = ErrorResponse {
            error: self.message().to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(msg) => Self::BadRequest(msg),
            RelayError::Storage(e) => Self::storage("Failed to process message", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code() {
        let cases = [
            (ApiError::not_found("x"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (
                ApiError::Internal("x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::from(RelayError::Validation("Message cannot be empty".into()));
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.message(), "Message cannot be empty");
    }

    #[test]
    fn test_storage_hides_cause() {
        let cause = StorageError::Schema(sqlx::Error::PoolClosed);
        let err = ApiError::from(RelayError::Storage(cause));
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.message(), "Failed to process message");
    }
}
