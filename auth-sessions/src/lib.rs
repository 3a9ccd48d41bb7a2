//! Session integrity for Workboard Core.
//!
//! A session is the durable record of one refresh lineage: which identity it
//! belongs to, which device opened it, the fingerprint of the currently valid
//! refresh assertion, and when it expires. The store is the authority for
//! revocation; the revocation cache in front of it is a pure optimization
//! that may be absent or down without affecting correctness.
//!
//! The rotation protocol makes refresh assertions single-use: presenting the
//! same assertion twice fails, because the first presentation atomically
//! swaps the stored lineage id and fingerprint for new ones.

pub mod cache;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use cache::*;
pub use error::*;
pub use models::*;
pub use repository::*;
pub use service::*;
