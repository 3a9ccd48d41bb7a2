use thiserror::Error;

/// Application-level error taxonomy.
///
/// Authentication failures are deliberately generic: callers must not be able
/// to tell "unknown user" from "wrong password" from "deactivated account".
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
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

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable label, used in logs and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Authentication { .. } => "authentication_error",
            AppError::Authorization { .. } => "authorization_error",
            AppError::Validation { .. } => "validation_error",
            AppError::Conflict { .. } => "conflict",
            AppError::NotFound { .. } => "not_found",
            AppError::Database(_) => "database_error",
            AppError::Cache(_) => "cache_error",
            AppError::Internal { .. } => "internal_error",
        }
    }
}

/// Result type alias for core operations.
pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(AppError::authentication("x").kind(), "authentication_error");
        assert_eq!(AppError::authorization("x").kind(), "authorization_error");
        assert_eq!(AppError::validation("x").kind(), "validation_error");
        assert_eq!(AppError::conflict("x").kind(), "conflict");
        assert_eq!(AppError::not_found("org").kind(), "not_found");
        assert_eq!(AppError::internal("x").kind(), "internal_error");
    }

    #[test]
    fn not_found_carries_resource_name() {
        let err = AppError::not_found("organization");
        assert!(err.to_string().contains("organization"));
    }
}
