use auth_tokens::TokenError;
use error_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Lineage unknown, inactive, expired, or owned by someone else.
    #[error("Session revoked")]
    Revoked,

    /// Presented refresh value no longer matches the stored fingerprint, or
    /// a concurrent rotation won the swap.
    #[error("Refresh assertion replayed")]
    Replayed,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Cache(err.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            // Both surface as the same "revoked" authentication failure; the
            // distinction stays in logs.
            SessionError::Revoked | SessionError::Replayed => {
                AppError::authentication("Token has been revoked")
            }
            SessionError::Token(e) => e.into(),
            SessionError::Database(e) => AppError::Database(e),
            SessionError::Cache(msg) => AppError::Cache(msg),
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
