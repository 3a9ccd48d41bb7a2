use error_core::AppError;
use thiserror::Error;

/// Verification and signing failures.
///
/// `Expired` and `Invalid` are distinguished here for logging; both collapse
/// into the same generic authentication failure at the boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token missing")]
    Missing,

    #[error("Token expired")]
    Expired,

    #[error("Token invalid")]
    Invalid,

    #[error("Token signing failed")]
    Signing,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing => AppError::internal("Credential signing failed"),
            _ => AppError::authentication("Invalid or expired credentials"),
        }
    }
}
