use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Message shown to the uploader whenever storage or the document store fails.
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload document. Please try again.";

/// Locally produced input errors. These block the triggering action and are
/// shown inline to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File size must be less than 10MB")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Only PDF, JPEG, and PNG files are allowed")]
    UnsupportedType(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown document category: {0}")]
    UnknownCategory(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ValidationError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            ValidationError::MissingField(_) => "MISSING_FIELD",
            ValidationError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
        }
    }
}

/// Failures reported by the auth provider, the document store or object storage.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for BackendError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => BackendError::NotFound("row".to_string()),
            sqlx::Error::Io(io) => BackendError::NetworkFailure(io.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                BackendError::NetworkFailure(e.to_string())
            }
            other => BackendError::Unknown(other.to_string()),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Upload failed: {0}")]
    UploadFailed(BackendError),

    #[error("Backend error: {0}")]
    Backend(BackendError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NotFound(what) => AppError::NotFound(what),
            BackendError::PermissionDenied => AppError::Forbidden,
            other => AppError::Backend(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.code(), e.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::UploadFailed(e) => {
                tracing::error!("Upload error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPLOAD_FAILED",
                    UPLOAD_FAILED_MESSAGE.to_string(),
                )
            }
            AppError::Backend(e) => {
                tracing::error!("Backend error: {e}");
                let status = match e {
                    BackendError::NetworkFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    "BACKEND_ERROR",
                    "A backend error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_match_portal_copy() {
        let too_large = ValidationError::FileTooLarge {
            size_bytes: 11_000_000,
            limit_bytes: 10_485_760,
        };
        assert_eq!(too_large.to_string(), "File size must be less than 10MB");
        assert_eq!(
            ValidationError::UnsupportedType("application/zip".to_string()).to_string(),
            "Only PDF, JPEG, and PNG files are allowed"
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let e: BackendError = sqlx::Error::RowNotFound.into();
        assert!(matches!(e, BackendError::NotFound(_)));
    }

    #[test]
    fn test_permission_denied_becomes_forbidden() {
        let e: AppError = BackendError::PermissionDenied.into();
        assert!(matches!(e, AppError::Forbidden));
    }

    #[test]
    fn test_upload_failure_status_is_bad_gateway() {
        let resp = AppError::UploadFailed(BackendError::Unknown("boom".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
