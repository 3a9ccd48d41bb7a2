//! Shared error taxonomy for Workboard Core.
//!
//! Every crate defines its own `thiserror` enum for the failures it can
//! produce; those enums convert into [`AppError`], the single taxonomy the
//! top-level handler maps onto HTTP status codes. The taxonomy deliberately
//! stays small: authentication, authorization, validation, conflict,
//! not-found, plus infrastructure buckets.

pub mod detach;
pub mod types;

pub use detach::*;
pub use types::*;
