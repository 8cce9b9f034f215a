//! Application Error Types
//!
//! Centralized error handling: `AppError` for storage and the HTTP surface,
//! `GatewayError` for per-event failures inside a websocket session.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 10003, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 10004, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    10000,
                    "Internal server error".into(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    10000,
                    "Internal server error".into(),
                )
            }
        };

        let body = ErrorResponse { code, message };

        (status, Json(body)).into_response()
    }
}

/// Error raised while handling a single inbound websocket event.
///
/// These never terminate the connection: the gateway converts them into a
/// unicast `error` envelope back to the offending session only. The optional
/// message id is echoed in the error details so the client can mark the
/// right message.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound {
        message: String,
        message_id: Option<i64>,
    },

    #[error("{message}")]
    Forbidden {
        message: String,
        message_id: Option<i64>,
    },

    #[error("Attachment is invalid: {0}")]
    AttachmentInvalid(String),

    #[error("File is too big: {size_mb} MB. Must be less than {limit_mb} MB")]
    AttachmentTooLarge { size_mb: u64, limit_mb: u64 },

    #[error("Bus delivery failed: {0}")]
    BusDelivery(String),

    #[error("Storage error: {0}")]
    Storage(#[from] AppError),
}

impl GatewayError {
    /// Convenience constructor for field-level validation failures.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The message id the failure refers to, when there is one.
    pub fn message_id(&self) -> Option<i64> {
        match self {
            Self::NotFound { message_id, .. } | Self::Forbidden { message_id, .. } => *message_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_too_large_reports_sizes_in_mb() {
        let err = GatewayError::AttachmentTooLarge {
            size_mb: 3,
            limit_mb: 1,
        };
        assert_eq!(
            err.to_string(),
            "File is too big: 3 MB. Must be less than 1 MB"
        );
    }

    #[test]
    fn message_id_is_carried_by_not_found_and_forbidden() {
        let err = GatewayError::NotFound {
            message: "Message with the specified ID was not found".into(),
            message_id: Some(42),
        };
        assert_eq!(err.message_id(), Some(42));

        let err = GatewayError::validation("Text is required");
        assert_eq!(err.message_id(), None);
    }
}
