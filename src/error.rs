//! Structured error types for API responses.

use crate::db::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidId,
    NotFound,
    DuplicateTask,
    ServerError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError | ErrorCode::InvalidId => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateTask => StatusCode::CONFLICT,
            ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error for API responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub message: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_task_id: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            details: None,
            existing_task_id: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_existing_task_id(mut self, id: impl ToString) -> Self {
        self.existing_task_id = Some(id.to_string());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    // Convenience constructors

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn title_required() -> Self {
        Self::validation("Title is required and cannot be empty")
    }

    pub fn invalid_id() -> Self {
        Self::new(ErrorCode::InvalidId, "Invalid task ID format")
    }

    pub fn task_not_found() -> Self {
        Self::new(ErrorCode::NotFound, "Task not found")
    }

    /// Advisory duplicate: another task already holds this title.
    pub fn duplicate_of(existing_id: impl ToString) -> Self {
        Self::new(ErrorCode::DuplicateTask, "Task with this title already exists")
            .with_existing_task_id(existing_id)
    }

    /// Duplicate reported by the unique index on write.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateTask, message)
    }

    /// Generic server error. The cause is logged, never returned.
    pub fn server(err: impl fmt::Display) -> Self {
        error!(error = %err, "Request failed with server error");
        Self::new(ErrorCode::ServerError, "Server Error")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::task_not_found(),
            StoreError::DuplicateKey => ApiError::duplicate("Duplicate task detected"),
            StoreError::Validation(errors) => {
                let message = errors.primary().unwrap_or("Validation failed").to_string();
                ApiError::validation(message).with_details(errors.into_messages())
            }
            other => ApiError::server(other),
        }
    }
}

/// Error envelope: `{ "success": false, "error": { ... } }`.
#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    error: &'a ApiError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            success: false,
            error: &self,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Result type for handler operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrors;
    use serde_json::json;

    #[test]
    fn test_error_code_statuses() {
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::DuplicateTask.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::ServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = ApiError::duplicate_of("abc");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "Task with this title already exists",
                "code": "DUPLICATE_TASK",
                "existingTaskId": "abc",
            })
        );
    }

    #[test]
    fn test_store_validation_maps_to_aggregated_error() {
        let mut errors = ValidationErrors::new();
        errors.push("Title needs to be at least 5 characters");
        errors.push("Description cannot exceed 500 characters");

        let err = ApiError::from(StoreError::Validation(errors));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Title needs to be at least 5 characters");
        assert_eq!(err.details.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_store_duplicate_key_maps_to_conflict() {
        let err = ApiError::from(StoreError::DuplicateKey);
        assert_eq!(err.code, ErrorCode::DuplicateTask);
        assert!(err.existing_task_id.is_none());
    }

    #[test]
    fn test_server_error_hides_cause() {
        let err = ApiError::from(StoreError::Poisoned);
        assert_eq!(err.code, ErrorCode::ServerError);
        assert_eq!(err.message, "Server Error");
        assert!(err.details.is_none());
    }
}
