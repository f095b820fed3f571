//! Unified error handling for the call sync service
//!
//! Every failure that can cross an ingress boundary is expressed as an
//! `AppError`, which maps itself onto an HTTP status and a JSON body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Authentication Errors ====================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // ==================== Configuration Errors ====================
    #[error("Configuration error: {0}")]
    Config(String),

    // ==================== Storage Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::MissingField(_) => "missing_field",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Config(_) => "config_error",
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to hand back to a caller.
    ///
    /// Storage and internal failures are logged with their cause where they
    /// happen; the response only carries a generic description.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Pool(_) | AppError::Transaction(_) => {
                "storage error".to_string()
            }
            AppError::Internal(_) => "server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the caller may safely re-run the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Pool(_) | AppError::Transaction(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.public_message(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

/// Failure talking to the upstream call platform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream credential is not configured")]
    MissingCredential,

    #[error("HTTP error: status {status}")]
    Http { status: u16, body: String },

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Misconfiguration on our side rather than an unreliable upstream
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpstreamError::MissingCredential)
    }
}

// ==================== From implementations ====================

// Non-fatal upstream errors are absorbed by the reconciler.
impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingCredential => {
                AppError::Config("VAPI_API_KEY missing".to_string())
            }
            other => AppError::Internal(format!("Upstream fetch failed: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::MissingField("assistantId".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("bad secret".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Config("VAPI_API_KEY missing".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Transaction("commit".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Config(String::new()).error_code(), "config_error");
        assert_eq!(
            AppError::Validation(String::new()).error_code(),
            "validation_error"
        );
    }

    #[test]
    fn test_upstream_error_conversion() {
        let err: AppError = UpstreamError::MissingCredential.into();
        assert_eq!(err.error_code(), "config_error");

        let err: AppError = UpstreamError::Http {
            status: 503,
            body: "unavailable".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "internal_error");
        assert_eq!(err.public_message(), "server error");
        assert!(!UpstreamError::Transport("reset".to_string()).is_fatal());
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::Database("relation \"call_records\" does not exist".to_string());
        assert_eq!(err.public_message(), "storage error");
        assert!(err.is_retryable());

        let err = AppError::Config("VAPI_API_KEY missing".to_string());
        assert!(err.public_message().contains("VAPI_API_KEY missing"));
        assert!(!err.is_retryable());
    }
}
