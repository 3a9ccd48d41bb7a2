//! Credential issuing for Workboard Core.
//!
//! Two assertion types, both HS256 JWTs with fixed issuer/audience claims:
//!
//! - **Access assertions** prove identity for a single request window
//!   (minutes). Never stored server-side; verified purely by signature and
//!   expiry.
//! - **Refresh assertions** mint new pairs (days). Each embeds a rotation
//!   lineage id and is single-use: the session store keeps only a SHA-256
//!   fingerprint of the raw value, swapped atomically on every rotation.
//!
//! The two assertion types are signed with distinct secrets so that one can
//! never pass verification as the other.

pub mod claims;
pub mod config;
pub mod error;
pub mod service;

pub use claims::*;
pub use config::*;
pub use error::*;
pub use service::*;
