//! Tenant boundary for Workboard Core.
//!
//! Organizations are the isolation unit: every scoped entity carries an
//! organization id and every scoped query filters on it. This crate owns the
//! membership join records, binds each request to exactly one organization
//! (the tenant resolver), and turns tenant-scoped identity into allow/deny
//! decisions (the permission checker).

pub mod checker;
pub mod error;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod service;

pub use checker::*;
pub use error::*;
pub use models::*;
pub use repository::*;
pub use resolver::*;
pub use service::*;
