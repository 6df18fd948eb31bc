use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes, grouped by surface.
///
/// Ranges:
/// - E0xxx: shared/infrastructure errors
/// - E1xxx: auth errors
/// - E2xxx: user errors
/// - E3xxx: contact errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    BadRequest,
    RateLimited,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    EmailNotConfirmed,
    TokenExpired,
    TokenInvalid,
    TokenScopeMismatch,
    RefreshTokenMismatch,
    VerificationFailed,
    PasswordTooWeak,

    // Users (E2xxx)
    UserNotFound,
    AvatarUploadFailed,

    // Contacts (E3xxx)
    ContactNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::BadRequest => "E0005",
            Self::RateLimited => "E0006",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::EmailNotConfirmed => "E1003",
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",
            Self::TokenScopeMismatch => "E1006",
            Self::RefreshTokenMismatch => "E1007",
            Self::VerificationFailed => "E1008",
            Self::PasswordTooWeak => "E1009",

            // Users
            Self::UserNotFound => "E2001",
            Self::AvatarUploadFailed => "E2002",

            // Contacts
            Self::ContactNotFound => "E3001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::VerificationFailed | Self::AvatarUploadFailed => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::ContactNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::EmailNotConfirmed
            | Self::TokenExpired | Self::TokenInvalid | Self::TokenScopeMismatch
            | Self::RefreshTokenMismatch => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known { code: ErrorCode, message: String },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message } => {
                (code.status_code(), ApiErrorResponse::new(code.code(), message))
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    // users.email is the only unique constraint; a racing
                    // duplicate insert lands here.
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => (
                        StatusCode::CONFLICT,
                        ApiErrorResponse::new(
                            ErrorCode::EmailAlreadyExists.code(),
                            "email already registered",
                        ),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_unauthorized() {
        for code in [
            ErrorCode::InvalidCredentials,
            ErrorCode::EmailNotConfirmed,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::TokenScopeMismatch,
            ErrorCode::RefreshTokenMismatch,
        ] {
            assert_eq!(code.status_code(), StatusCode::UNAUTHORIZED, "{:?}", code);
        }
    }

    #[test]
    fn duplicate_registration_is_conflict() {
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn verification_failure_is_bad_request() {
        assert_eq!(ErrorCode::VerificationFailed.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unique_violation_renders_conflict() {
        let err = AppError::Database(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        ));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_row_renders_not_found() {
        let err = AppError::Database(diesel::result::Error::NotFound);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_database_errors_render_500() {
        let err = AppError::Database(diesel::result::Error::RollbackTransaction);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_codes_are_unique() {
        let codes = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::BadRequest,
            ErrorCode::RateLimited,
            ErrorCode::InvalidCredentials,
            ErrorCode::EmailAlreadyExists,
            ErrorCode::EmailNotConfirmed,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::TokenScopeMismatch,
            ErrorCode::RefreshTokenMismatch,
            ErrorCode::VerificationFailed,
            ErrorCode::PasswordTooWeak,
            ErrorCode::UserNotFound,
            ErrorCode::AvatarUploadFailed,
            ErrorCode::ContactNotFound,
        ];
        let mut seen: Vec<&str> = codes.iter().map(|c| c.code()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), codes.len());
    }
}
