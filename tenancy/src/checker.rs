use std::sync::Arc;

use auth_rbac::{expand_action, normalize, role_allows_all, role_allows_any};
use uuid::Uuid;

use crate::error::TenancyResult;
use crate::repository::MembershipRepository;

/// Permission decisions for tenant-scoped requests.
///
/// Side-effect free and uncached: every call reads the membership fresh, so
/// a concurrent role change is never served stale. Safe to call repeatedly
/// per request.
pub struct PermissionChecker {
    memberships: Arc<dyn MembershipRepository>,
}

impl PermissionChecker {
    pub fn new(memberships: Arc<dyn MembershipRepository>) -> Self {
        Self { memberships }
    }

    /// Allow/deny for `(identity, organization, action)`.
    ///
    /// 1. Global elevated privilege allows unconditionally.
    /// 2. No active membership denies.
    /// 3. No requested action: bare membership grants read-level access.
    /// 4. Unrecognized stored role denies (never defaulted upward).
    /// 5. The action expands through the alias table; ANY overlap with the
    ///    role's static permission set allows.
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        is_global_admin: bool,
        organization_id: Uuid,
        action: Option<&str>,
    ) -> TenancyResult<bool> {
        if is_global_admin {
            return Ok(true);
        }
        let Some(membership) = self.memberships.find_active(user_id, organization_id).await?
        else {
            return Ok(false);
        };
        let Some(action) = action else {
            return Ok(true);
        };
        let Some(role) = normalize(&membership.role) else {
            return Ok(false);
        };
        let requested = expand_action(action);
        if requested.is_empty() {
            return Ok(false);
        }
        Ok(role_allows_any(role, &requested))
    }

    /// Stricter variant: every expanded token must be granted.
    pub async fn has_all_permissions(
        &self,
        user_id: Uuid,
        is_global_admin: bool,
        organization_id: Uuid,
        action: &str,
    ) -> TenancyResult<bool> {
        if is_global_admin {
            return Ok(true);
        }
        let Some(membership) = self.memberships.find_active(user_id, organization_id).await?
        else {
            return Ok(false);
        };
        let Some(role) = normalize(&membership.role) else {
            return Ok(false);
        };
        Ok(role_allows_all(role, &expand_action(action)))
    }
}
