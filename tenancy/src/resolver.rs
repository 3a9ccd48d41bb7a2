use std::sync::Arc;

use uuid::Uuid;

use crate::error::{TenancyError, TenancyResult};
use crate::repository::MembershipRepository;

/// Candidate organization ids gathered from one request, one slot per
/// source. Precedence is fixed: path, then query, then body, then header,
/// then the session-remembered organization.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrgSelection {
    pub path: Option<Uuid>,
    pub query: Option<Uuid>,
    pub body: Option<Uuid>,
    pub header: Option<Uuid>,
    pub remembered: Option<Uuid>,
}

impl OrgSelection {
    pub fn candidate(&self) -> Option<Uuid> {
        self.path
            .or(self.query)
            .or(self.body)
            .or(self.header)
            .or(self.remembered)
    }

    pub fn from_body(organization_id: Uuid) -> Self {
        Self {
            body: Some(organization_id),
            ..Self::default()
        }
    }
}

/// Binds a request to exactly one organization id and verifies the caller
/// may operate against it.
pub struct TenantResolver {
    memberships: Arc<dyn MembershipRepository>,
}

impl TenantResolver {
    pub fn new(memberships: Arc<dyn MembershipRepository>) -> Self {
        Self { memberships }
    }

    /// Resolve the organization for this request.
    ///
    /// With no explicit source, the identity's oldest active membership is
    /// the deterministic default. Identities holding the global
    /// elevated-privilege flag skip the membership check but still need a
    /// resolved organization id: tenant-scoped endpoints never run
    /// un-scoped.
    pub async fn resolve(
        &self,
        user_id: Uuid,
        is_global_admin: bool,
        selection: &OrgSelection,
    ) -> TenancyResult<Uuid> {
        let candidate = match selection.candidate() {
            Some(id) => id,
            None => self
                .memberships
                .list_active_for_user(user_id)
                .await?
                .first()
                .map(|m| m.organization_id)
                .ok_or(TenancyError::NoOrganization)?,
        };

        if is_global_admin {
            return Ok(candidate);
        }

        match self.memberships.find_active(user_id, candidate).await? {
            Some(_) => Ok(candidate),
            None => Err(TenancyError::NotAMember),
        }
    }
}
