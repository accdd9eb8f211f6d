//! Error handling for the libris HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing input.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A path identifier that does not parse.
    #[error("invalid identifier: {message}")]
    InvalidIdentifier { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    /// Any failure reported by the backing store.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Machine-readable code carried next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation_error",
            AppError::InvalidIdentifier { .. } => "invalid_identifier",
            AppError::NotFound { .. } => "not_found",
            AppError::Persistence { .. } => "persistence_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::InvalidIdentifier { .. }
            | AppError::Persistence { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let status = self.status();
        let code = self.code();

        let message = match self {
            AppError::Validation { message }
            | AppError::InvalidIdentifier { message }
            | AppError::NotFound { message }
            | AppError::Persistence { message } => message,
            AppError::Internal(e) => format!("{e:#}"),
        };

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                error_code = code,
                status_code = status.as_u16(),
                error = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                error_code = code,
                status_code = status.as_u16(),
                error = %message,
                "Request rejected"
            );
        }

        // In production, we might want to hide internal error details
        let message = if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR
        {
            "An internal server error occurred".to_string()
        } else {
            message
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                code,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::validation("\"price\" must be a positive number");

        match error {
            AppError::Validation { message } => {
                assert_eq!(message, "\"price\" must be a positive number");
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[tokio::test]
    async fn test_validation_maps_to_400() {
        let (status, json) = error_to_response(AppError::validation("bad payload")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad payload");
        assert_eq!(json["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_invalid_identifier_maps_to_400() {
        let (status, json) = error_to_response(AppError::invalid_identifier("Invalid book ID")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid book ID");
        assert_eq!(json["code"], "invalid_identifier");
    }

    #[tokio::test]
    async fn test_not_found_maps_to_404() {
        let (status, json) = error_to_response(AppError::not_found("Book not found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Book not found");
    }

    #[tokio::test]
    async fn test_persistence_maps_to_400() {
        let (status, json) =
            error_to_response(AppError::persistence("Failed to create a new book: boom")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "persistence_error");
    }

    #[test]
    fn test_internal_error_mapping() {
        let internal_error = anyhow::anyhow!("Database connection failed");
        let error = AppError::Internal(internal_error);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
