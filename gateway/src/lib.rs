//! Request boundary for Workboard Core.
//!
//! The route layer stays thin: these extractors turn an incoming request
//! into an authenticated identity context and a resolved organization id,
//! and [`ApiError`] is the single place the error taxonomy becomes HTTP
//! status codes. Handlers receive [`CurrentUser`] / [`OrgScope`] arguments
//! and never touch tokens or membership rows themselves.

pub mod error;
pub mod extract;
pub mod state;

pub use error::*;
pub use extract::*;
pub use state::*;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging for binaries and integration tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
