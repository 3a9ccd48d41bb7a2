use std::sync::Arc;

use auth_identity::IdentityService;
use tenancy::{PermissionChecker, TenantResolver};

/// Shared service handles for the extractors, injected into the router as an
/// `Extension` layer by the consuming application.
#[derive(Clone)]
pub struct AuthState {
    pub identity: Arc<IdentityService>,
    pub resolver: Arc<TenantResolver>,
    pub checker: Arc<PermissionChecker>,
}

impl AuthState {
    pub fn new(
        identity: Arc<IdentityService>,
        resolver: Arc<TenantResolver>,
        checker: Arc<PermissionChecker>,
    ) -> Self {
        Self {
            identity,
            resolver,
            checker,
        }
    }
}
