use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

pub mod categories;

pub use categories::ErrorCategory;

use crate::observability::correlation::RequestContext;

#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub request_context: Option<RequestContext>,
}

impl AppError {
    pub fn with_category(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            details: None,
            source: None,
            request_context: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.request_context = Some(context);
        self
    }

    // Convenience constructors for common error types
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::ValidationError, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::InvalidState, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::Conflict, message)
    }

    pub fn authentication_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::AuthenticationError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::DatabaseError, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_category(ErrorCategory::InternalError, message)
    }

    pub fn new(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        let error = error.into();
        let category = match status {
            StatusCode::BAD_REQUEST => ErrorCategory::ValidationError,
            StatusCode::UNAUTHORIZED => ErrorCategory::AuthenticationError,
            StatusCode::NOT_FOUND => ErrorCategory::NotFound,
            StatusCode::CONFLICT => ErrorCategory::Conflict,
            StatusCode::SERVICE_UNAVAILABLE => ErrorCategory::ServiceUnavailable,
            _ => ErrorCategory::InternalError,
        };

        Self::with_category(category, error.to_string())
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.category.status_code();

        if status.is_server_error() {
            error!(
                category = ?self.category,
                code = self.category.error_code(),
                message = %self.message,
                details = ?self.details,
                source = ?self.source,
                correlation_id = self.request_context.as_ref().map(|c| &c.correlation_id),
                request_id = self.request_context.as_ref().map(|c| &c.request_id),
                "Internal server error"
            );
        } else {
            warn!(
                category = ?self.category,
                code = self.category.error_code(),
                message = %self.message,
                details = ?self.details,
                correlation_id = self.request_context.as_ref().map(|c| &c.correlation_id),
                request_id = self.request_context.as_ref().map(|c| &c.request_id),
                "Client error"
            );
        }

        // Return sanitized error to client
        let body = json!({
            "error": {
                "code": self.category.error_code(),
                "message": self.message,
                "details": self.details,
                "correlation_id": self.request_context.as_ref().map(|c| &c.correlation_id),
                "request_id": self.request_context.as_ref().map(|c| &c.request_id),
            }
        });

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // anyhow::Error already carries the full chain, use its string form
        Self::internal_error(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation_error(format!("JSON parsing error: {}", err)).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convenience_constructors() {
        let err = AppError::invalid_state("only pending requests can be cancelled");
        assert_eq!(err.category.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.category.error_code(), "INVALID_STATE");

        let err = AppError::not_found("payout request not found");
        assert_eq!(err.category.status_code(), StatusCode::NOT_FOUND);

        let err = AppError::conflict("stale status update");
        assert_eq!(err.category.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_display_includes_category_and_message() {
        let err = AppError::validation_error("amount must be greater than zero");
        assert_eq!(
            err.to_string(),
            "VALIDATION_ERROR: amount must be greater than zero"
        );
    }

    #[test]
    fn test_from_status_code() {
        let err = AppError::new(StatusCode::CONFLICT, anyhow::anyhow!("duplicate delivery"));
        assert!(matches!(err.category, ErrorCategory::Conflict));
    }
}
