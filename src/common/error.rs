// Error handling types for the API
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;
use crate::auth::password::PasswordError;
use crate::auth::tokens::TokenError;
use crate::services::email::MailError;
use crate::services::google::IdentityError;

/// API error types
///
/// Every handler returns these; the variant decides the status code and the
/// caller never sees internal detail for the 5xx family.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input the caller can correct.
    Validation(String),
    /// Duplicate email/nickname or a policy version mismatch.
    Conflict(String),
    /// Bad credentials or an unusable confirmation/reset token.
    Authentication(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// Store or external provider failure. Detail is logged, not returned.
    Dependency(String),
    DatabaseError(sqlx::Error),
    InternalServer(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Authentication(msg) => write!(f, "Authentication Failed: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Dependency(msg) => write!(f, "Dependency Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::Authentication(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Dependency(_) | ApiError::DatabaseError(_) | ApiError::InternalServer(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (error_message, code) = match self {
            ApiError::Validation(msg) => (msg, "VALIDATION_ERROR"),
            ApiError::Conflict(msg) => (msg, "CONFLICT"),
            ApiError::Authentication(msg) => (msg, "AUTHENTICATION_FAILED"),
            ApiError::Unauthorized(msg) => (msg, "UNAUTHORIZED"),
            ApiError::Forbidden(msg) => (msg, "FORBIDDEN"),
            ApiError::NotFound(msg) => (msg, "NOT_FOUND"),
            ApiError::Dependency(detail) => {
                error!(detail = %detail, "Dependency failure");
                (
                    "Service temporarily unavailable. Please try again later.".to_string(),
                    "DEPENDENCY_ERROR",
                )
            }
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    "Database operation failed".to_string(),
                    "DATABASE_ERROR",
                )
            }
            ApiError::InternalServer(msg) => (msg, "INTERNAL_SERVER_ERROR"),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        ApiError::Dependency(format!("email delivery: {}", err))
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(_) => {
                ApiError::Authentication("Invalid Google token".to_string())
            }
            IdentityError::Unavailable(detail) => {
                ApiError::Dependency(format!("identity provider: {}", detail))
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(detail) => {
                error!(error = %detail, "Token signing failed");
                ApiError::InternalServer("Failed to issue tokens".to_string())
            }
            _ => ApiError::Forbidden("Invalid or expired token".to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        error!(error = %err, "Password hashing failed");
        ApiError::InternalServer("Failed to process password".to_string())
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> =
                result.errors.iter().map(|e| e.message.clone()).collect();
            ApiError::Validation(error_messages.join(" "))
        }
    }
}

/// Maps a unique-constraint violation to a `Conflict` carrying `message`,
/// anything else to a database error.
pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> ApiError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            ApiError::Conflict(message.to_string())
        }
        _ => ApiError::DatabaseError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_dependency_error_hides_detail() {
        let response =
            ApiError::Dependency("smtp relay refused connection".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "DEPENDENCY_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("smtp"));
    }

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Authentication("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_result_joins_messages() {
        let mut result = ValidationResult::new();
        result.add_error("email", "A valid email is required.");
        result.add_error("nickname", "Nickname is required.");

        match ApiError::from(result) {
            ApiError::Validation(msg) => {
                assert_eq!(msg, "A valid email is required. Nickname is required.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
