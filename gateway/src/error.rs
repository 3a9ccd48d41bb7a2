use auth_identity::IdentityError;
use auth_sessions::SessionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use error_core::AppError;
use serde::Serialize;
use tenancy::TenancyError;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// HTTP-facing error. One top-level mapping from the error taxonomy to
/// status codes and user-safe messages; internal detail is logged under a
/// correlation id and never put on the wire.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::Authorization { .. } => "authorization_error",
            ApiError::Validation { .. } => "validation_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// User-safe message. Unexpected errors collapse to a generic line;
    /// their detail lives in the log entry for the correlation id.
    fn public_message(&self) -> String {
        match self {
            ApiError::Internal { .. } => "An unexpected error occurred".to_string(),
            ApiError::ServiceUnavailable { .. } => {
                "Service temporarily unavailable, try again shortly".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Authentication { message } => ApiError::Authentication { message },
            AppError::Authorization { message } => ApiError::Authorization { message },
            AppError::Validation { message } => ApiError::Validation { message },
            AppError::Conflict { message } => ApiError::Conflict { message },
            AppError::NotFound { resource } => ApiError::NotFound { resource },
            AppError::Database(e) => ApiError::Internal {
                message: e.to_string(),
            },
            AppError::Cache(message) => ApiError::ServiceUnavailable { message },
            AppError::Internal { message } => ApiError::Internal { message },
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        AppError::from(err).into()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        AppError::from(err).into()
    }
}

impl From<TenancyError> for ApiError {
    fn from(err: TenancyError) -> Self {
        AppError::from(err).into()
    }
}

/// Wire format for error responses.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error_id: String,
    pub error_type: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        error!(
            error_id = %error_id,
            error_type = %self.error_type(),
            status_code = %status_code.as_u16(),
            error = %self,
            "request failed"
        );

        let body = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            message: self.public_message(),
            timestamp: chrono::Utc::now(),
        };
        (status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(
            ApiError::authentication("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::authorization("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TenancyError::DuplicateMembership).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(TenancyError::MembershipNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn stranger_tenancy_errors_are_forbidden_not_notfound() {
        let err = ApiError::from(TenancyError::NotAMember);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn revoked_sessions_map_to_unauthorized() {
        for session_err in [SessionError::Revoked, SessionError::Replayed] {
            let err = ApiError::from(session_err);
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn internal_detail_is_suppressed() {
        let err = ApiError::internal("connection string contains password");
        assert_eq!(err.public_message(), "An unexpected error occurred");
    }

    #[test]
    fn credential_failures_share_one_message() {
        let unknown = ApiError::from(IdentityError::InvalidCredentials);
        let ApiError::Authentication { message } = unknown else {
            panic!("expected authentication error");
        };
        assert_eq!(message, "Invalid email or password");
    }
}
