use auth_sessions::SessionError;
use auth_tokens::TokenError;
use error_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// Unknown email, wrong password, or deactivated account. The variants
    /// are collapsed on purpose; logs carry the distinction.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailAlreadyInUse,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password too weak")]
    WeakPassword,

    #[error("User not found")]
    UserNotFound,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Hashing error")]
    HashingError,
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => {
                AppError::authentication("Invalid email or password")
            }
            IdentityError::EmailAlreadyInUse => AppError::conflict("Email already in use"),
            IdentityError::InvalidEmail => AppError::validation("Invalid email format"),
            IdentityError::WeakPassword => {
                AppError::validation("Password does not meet the required policy")
            }
            IdentityError::UserNotFound => AppError::not_found("user"),
            IdentityError::Token(e) => e.into(),
            IdentityError::Session(e) => e.into(),
            IdentityError::Database(e) => AppError::Database(e),
            IdentityError::HashingError => AppError::internal("Password hashing failed"),
        }
    }
}

pub type IdentityResult<T> = std::result::Result<T, IdentityError>;
