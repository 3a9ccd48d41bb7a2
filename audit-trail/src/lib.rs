//! Audit trail for Workboard Core.
//!
//! Every privileged mutation appends an immutable record: who, what, when,
//! from where, with before/after diffs where applicable. Recording is
//! fire-and-forget: a failed write is logged and swallowed, never surfaced
//! to the request that triggered it. Records expire after a long retention
//! window and become eligible for automatic purge.

pub mod entry;
pub mod error;
pub mod recorder;
pub mod repository;

pub use entry::*;
pub use error::*;
pub use recorder::*;
pub use repository::*;
