//! Identity management for Workboard Core.
//!
//! Owns the immutable user record (email, password hash, activity and
//! elevated-privilege flags, soft-delete tombstone) and the authentication
//! flows that tie credentials to sessions: registration, login, refresh
//! rotation, logout, password change, and account deactivation.
//!
//! Authentication failures are indistinguishable from the outside: unknown
//! email, wrong password, and deactivated account all collapse into the same
//! generic error to prevent enumeration.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use config::*;
pub use error::*;
pub use models::*;
pub use repository::*;
pub use service::*;
