use error_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Audit storage rejected the entry: {0}")]
    Storage(String),
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::Database(e) => AppError::Database(e),
            AuditError::Storage(msg) => AppError::internal(msg),
        }
    }
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;
