//! Unified error types for all layers of the application.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for all layers of Libris.
///
/// The service layer returns these variants unchanged; the REST layer turns
/// them into status codes with [`LibrisError::status_code`]. Cache and
/// worker-pool failures never reach this type on a request path.
#[derive(Error, Debug)]
pub enum LibrisError {
    // ============ Domain Errors ============
    /// Resource not found
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Bad input shape or value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ Concurrency Errors ============
    /// A bounded internal wait ran out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// No concurrency slot was free
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // ============ Infrastructure Errors ============
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis/Cache error
    #[error("Cache error: {0}")]
    Cache(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LibrisError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Timeout(_) => 408,
            Self::Conflict(_) => 409,
            Self::RateLimitExceeded => 429,
            Self::Database(_)
            | Self::Configuration(_)
            | Self::Cache(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Timeout(_) => "TIMEOUT",
            Self::RateLimitExceeded => "RATE_LIMIT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the human-readable label used in the `error` field of API
    /// error bodies.
    #[must_use]
    pub fn error_label(&self) -> String {
        match self {
            Self::NotFound { resource_type, .. } => format!("{resource_type} not found"),
            Self::Validation(_) => "Validation error".to_string(),
            Self::Conflict(_) => "Duplicate resource".to_string(),
            Self::Timeout(_) => "Request timeout".to_string(),
            Self::RateLimitExceeded => "Rate limit exceeded".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Returns the detail message without the variant prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::Conflict(msg)
            | Self::Timeout(msg)
            | Self::Database(msg)
            | Self::Configuration(msg)
            | Self::Cache(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::RateLimitExceeded => "Too many concurrent requests".to_string(),
            Self::NotFound { .. } | Self::Other(_) => self.to_string(),
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout<T: Into<String>>(message: T) -> Self {
        Self::Timeout(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// True for the not-found variant.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for LibrisError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "Book",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation
                if db_err.code().as_deref() == Some("23505") {
                    return Self::Conflict(db_err.message().to_string());
                }
                Self::Database(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for LibrisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error body for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    /// Short human-readable label
    pub error: String,
    /// Detail message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// HTTP status code
    pub code: u16,
}

impl ErrorResponse {
    /// Creates a new error response from a `LibrisError`.
    #[must_use]
    pub fn from_error(error: &LibrisError) -> Self {
        Self {
            error: error.error_label(),
            message: error.detail(),
            code: error.status_code(),
        }
    }

    /// Creates an error response with an explicit label and message.
    #[must_use]
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code,
        }
    }
}

impl From<&LibrisError> for ErrorResponse {
    fn from(error: &LibrisError) -> Self {
        Self::from_error(error)
    }
}
