//! API response types.

use libris_core::{ErrorResponse, LibrisError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Success envelope: a message plus optional data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Creates a response carrying data.
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Creates a response with a message only.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Application error type for Axum.
#[derive(Debug)]
pub enum AppError {
    /// An error raised below the handler layer.
    Service(LibrisError),
    /// A request the handler rejected itself, with an explicit label.
    Request {
        status: StatusCode,
        error: &'static str,
        message: String,
    },
}

impl AppError {
    /// Body that does not decode as the expected JSON.
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::Request {
            status: StatusCode::BAD_REQUEST,
            error: "Invalid JSON",
            message: message.into(),
        }
    }

    /// Path id that is not a UUID.
    #[must_use]
    pub fn invalid_id() -> Self {
        Self::Request {
            status: StatusCode::BAD_REQUEST,
            error: "Invalid book ID",
            message: "ID must be a valid UUID".to_string(),
        }
    }

    pub fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            status: StatusCode::BAD_REQUEST,
            error,
            message: message.into(),
        }
    }
}

impl From<LibrisError> for AppError {
    fn from(err: LibrisError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Service(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(error = %err, "Request failed");
                }
                (status, ErrorResponse::from_error(&err))
            }
            Self::Request {
                status,
                error,
                message,
            } => (status, ErrorResponse::new(error, message, status.as_u16())),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Helper to create a 200 response.
pub fn ok<T: Serialize>(message: &str, data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::new(message, data)))
}

/// Helper to create a created (201) response.
pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::new(message, data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_missing_data() {
        let json = serde_json::to_value(ApiResponse::message("Book deleted successfully")).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Book deleted successfully"}));
    }

    #[test]
    fn test_service_error_status() {
        let response = AppError::from(LibrisError::not_found("Book", "x")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::from(LibrisError::RateLimitExceeded).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_request_error_status() {
        assert_eq!(AppError::invalid_id().into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::invalid_json("expected value").into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
