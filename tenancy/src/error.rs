use error_core::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TenancyError {
    /// The request names no organization and the identity belongs to none.
    #[error("No organization context; create or join an organization first")]
    NoOrganization,

    /// The identity has no active membership in the named organization.
    /// Deliberately an authorization failure, not a not-found: strangers must
    /// not learn whether the organization exists.
    #[error("Not a member of this organization")]
    NotAMember,

    /// The owner role can only move through an explicit ownership transfer.
    #[error("The owner role cannot be reassigned")]
    OwnerImmutable,

    #[error("The owner cannot leave the organization without transferring ownership")]
    OwnerCannotLeave,

    #[error("Unknown or unassignable role: {0}")]
    InvalidRole(String),

    #[error("Organization name cannot be empty")]
    InvalidOrganizationName,

    #[error("Already a member of this organization")]
    DuplicateMembership,

    #[error("Organization slug already in use")]
    SlugTaken,

    #[error("Membership not found")]
    MembershipNotFound,

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<TenancyError> for AppError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::NoOrganization => AppError::validation(
                "No organization context; create or join an organization first",
            ),
            TenancyError::NotAMember => {
                AppError::authorization("You do not have access to this organization")
            }
            TenancyError::OwnerImmutable => {
                AppError::authorization("The owner role cannot be reassigned")
            }
            TenancyError::OwnerCannotLeave => AppError::authorization(
                "The owner cannot leave the organization without transferring ownership",
            ),
            TenancyError::InvalidRole(role) => {
                AppError::validation(format!("Unknown or unassignable role: {role}"))
            }
            TenancyError::InvalidOrganizationName => {
                AppError::validation("Organization name cannot be empty")
            }
            TenancyError::DuplicateMembership => {
                AppError::conflict("Already a member of this organization")
            }
            TenancyError::SlugTaken => AppError::conflict("Organization slug already in use"),
            TenancyError::MembershipNotFound => AppError::not_found("membership"),
            TenancyError::OrganizationNotFound => AppError::not_found("organization"),
            TenancyError::Database(e) => AppError::Database(e),
        }
    }
}

pub type TenancyResult<T> = std::result::Result<T, TenancyError>;
