//! Role vocabulary and permission tables for Workboard Core.
//!
//! Organization roles accumulated several spellings over product history
//! ("viewer", "staff", "org_admin", …). This crate owns the single alias
//! table that maps every spelling onto the closed canonical enum, plus the
//! static per-role permission sets the permission checker consults. All of it
//! is data and pure functions; storage lookups live in the `tenancy` crate.

pub mod permissions;
pub mod roles;

pub use permissions::*;
pub use roles::*;
