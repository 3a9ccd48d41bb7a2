use std::sync::Arc;

use auth_rbac::{normalize, CanonicalRole};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{TenancyError, TenancyResult};
use crate::models::{slugify, Membership, MembershipStatus, Organization, PlanTier};
use crate::repository::{MembershipRepository, OrganizationRepository};

/// Organization and membership lifecycle.
///
/// Enforces the role state machine: the owner role is immutable outside an
/// explicit ownership transfer, owners cannot be removed or leave, and no
/// membership may carry the owner or global-admin role unless created by
/// organization bootstrap. Whether the *caller* may manage members is the
/// route layer's question, answered by [`crate::PermissionChecker`]; the
/// invariants here hold regardless of who asks.
pub struct MembershipService {
    organizations: Arc<dyn OrganizationRepository>,
    memberships: Arc<dyn MembershipRepository>,
}

impl MembershipService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        memberships: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            organizations,
            memberships,
        }
    }

    /// Create an organization; the creator becomes its owner.
    pub async fn create_organization(
        &self,
        name: &str,
        plan: PlanTier,
        creator_id: Uuid,
    ) -> TenancyResult<(Organization, Membership)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TenancyError::InvalidOrganizationName);
        }

        let now = Utc::now();
        let mut org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            plan,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        // The slug unique index is the authority; one retry with a
        // disambiguating suffix covers the common collision.
        org = match self.organizations.create(org.clone()).await {
            Ok(created) => created,
            Err(TenancyError::SlugTaken) => {
                let suffix = &org.id.simple().to_string()[..8];
                org.slug = format!("{}-{}", org.slug, suffix);
                self.organizations.create(org).await?
            }
            Err(e) => return Err(e),
        };

        let membership = self
            .memberships
            .create(Membership {
                id: Uuid::new_v4(),
                user_id: creator_id,
                organization_id: org.id,
                role: CanonicalRole::Owner.as_str().to_string(),
                status: MembershipStatus::Active,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await?;

        info!(organization_id = %org.id, slug = %org.slug, "organization created");
        Ok((org, membership))
    }

    /// Add a member (invite acceptance). The owner role cannot be granted
    /// this way, and unknown role labels are rejected outright.
    pub async fn add_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: &str,
    ) -> TenancyResult<Membership> {
        self.ensure_organization(organization_id).await?;
        match normalize(role) {
            None => return Err(TenancyError::InvalidRole(role.to_string())),
            Some(CanonicalRole::Owner) => return Err(TenancyError::OwnerImmutable),
            Some(CanonicalRole::GlobalAdmin) => {
                return Err(TenancyError::InvalidRole(role.to_string()))
            }
            Some(_) => {}
        }

        let now = Utc::now();
        self.memberships
            .create(Membership {
                id: Uuid::new_v4(),
                user_id,
                organization_id,
                role: role.to_string(),
                status: MembershipStatus::Active,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await
    }

    /// Reassign a member's role. Touching the owner in either direction is
    /// an authorization failure, reserved for the ownership-transfer path.
    pub async fn change_role(
        &self,
        organization_id: Uuid,
        target_user_id: Uuid,
        new_role: &str,
    ) -> TenancyResult<Membership> {
        let membership = self
            .memberships
            .find_active(target_user_id, organization_id)
            .await?
            .ok_or(TenancyError::MembershipNotFound)?;

        if normalize(&membership.role) == Some(CanonicalRole::Owner) {
            return Err(TenancyError::OwnerImmutable);
        }
        match normalize(new_role) {
            None => return Err(TenancyError::InvalidRole(new_role.to_string())),
            Some(CanonicalRole::Owner) => return Err(TenancyError::OwnerImmutable),
            Some(CanonicalRole::GlobalAdmin) => {
                return Err(TenancyError::InvalidRole(new_role.to_string()))
            }
            Some(_) => {}
        }

        self.memberships
            .update_role(membership.id, new_role)
            .await?;
        Ok(Membership {
            role: new_role.to_string(),
            updated_at: Utc::now(),
            ..membership
        })
    }

    /// Remove a member. Owners cannot be removed.
    pub async fn remove_member(
        &self,
        organization_id: Uuid,
        target_user_id: Uuid,
    ) -> TenancyResult<()> {
        let membership = self
            .memberships
            .find_active(target_user_id, organization_id)
            .await?
            .ok_or(TenancyError::MembershipNotFound)?;

        if normalize(&membership.role) == Some(CanonicalRole::Owner) {
            return Err(TenancyError::OwnerImmutable);
        }
        self.memberships.soft_delete(membership.id).await
    }

    /// Voluntary departure. Owners must transfer ownership first.
    pub async fn leave(&self, organization_id: Uuid, user_id: Uuid) -> TenancyResult<()> {
        let membership = self
            .memberships
            .find_active(user_id, organization_id)
            .await?
            .ok_or(TenancyError::MembershipNotFound)?;

        if normalize(&membership.role) == Some(CanonicalRole::Owner) {
            return Err(TenancyError::OwnerCannotLeave);
        }
        self.memberships.soft_delete(membership.id).await
    }

    /// Suspend a member without removing the record. Owners cannot be
    /// suspended.
    pub async fn suspend_member(
        &self,
        organization_id: Uuid,
        target_user_id: Uuid,
    ) -> TenancyResult<()> {
        let membership = self
            .memberships
            .find_active(target_user_id, organization_id)
            .await?
            .ok_or(TenancyError::MembershipNotFound)?;

        if normalize(&membership.role) == Some(CanonicalRole::Owner) {
            return Err(TenancyError::OwnerImmutable);
        }
        self.memberships
            .update_status(membership.id, MembershipStatus::Suspended)
            .await
    }

    pub async fn members_of(&self, organization_id: Uuid) -> TenancyResult<Vec<Membership>> {
        self.ensure_organization(organization_id).await?;
        self.memberships.list_for_organization(organization_id).await
    }

    async fn ensure_organization(&self, organization_id: Uuid) -> TenancyResult<()> {
        self.organizations
            .find_by_id(organization_id)
            .await?
            .map(|_| ())
            .ok_or(TenancyError::OrganizationNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryMembershipRepository, InMemoryOrganizationRepository};

    fn service() -> MembershipService {
        MembershipService::new(
            Arc::new(InMemoryOrganizationRepository::new()),
            Arc::new(InMemoryMembershipRepository::new()),
        )
    }

    #[tokio::test]
    async fn creator_becomes_owner() {
        let svc = service();
        let creator = Uuid::new_v4();
        let (org, membership) = svc
            .create_organization("Acme Inc.", PlanTier::Free, creator)
            .await
            .unwrap();
        assert_eq!(org.slug, "acme-inc");
        assert_eq!(membership.user_id, creator);
        assert_eq!(normalize(&membership.role), Some(CanonicalRole::Owner));
    }

    #[tokio::test]
    async fn slug_collision_gets_a_suffix() {
        let svc = service();
        let (first, _) = svc
            .create_organization("Acme", PlanTier::Free, Uuid::new_v4())
            .await
            .unwrap();
        let (second, _) = svc
            .create_organization("Acme", PlanTier::Free, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(first.slug, "acme");
        assert!(second.slug.starts_with("acme-"));
        assert_ne!(first.slug, second.slug);
    }

    #[tokio::test]
    async fn owner_role_cannot_be_granted_or_taken() {
        let svc = service();
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let (org, _) = svc
            .create_organization("Acme", PlanTier::Free, owner)
            .await
            .unwrap();
        svc.add_member(org.id, member, "employee").await.unwrap();

        // Granting ownership through add or reassignment is rejected.
        let err = svc
            .add_member(org.id, Uuid::new_v4(), "owner")
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::OwnerImmutable));
        let err = svc.change_role(org.id, member, "owner").await.unwrap_err();
        assert!(matches!(err, TenancyError::OwnerImmutable));

        // So is touching the owner's own membership.
        let err = svc.change_role(org.id, owner, "employee").await.unwrap_err();
        assert!(matches!(err, TenancyError::OwnerImmutable));
        let err = svc.remove_member(org.id, owner).await.unwrap_err();
        assert!(matches!(err, TenancyError::OwnerImmutable));
    }

    #[tokio::test]
    async fn owner_cannot_leave_without_transfer() {
        let svc = service();
        let owner = Uuid::new_v4();
        let (org, _) = svc
            .create_organization("Acme", PlanTier::Free, owner)
            .await
            .unwrap();
        let err = svc.leave(org.id, owner).await.unwrap_err();
        assert!(matches!(err, TenancyError::OwnerCannotLeave));
    }

    #[tokio::test]
    async fn non_owner_roles_are_reassignable_and_members_can_leave() {
        let svc = service();
        let member = Uuid::new_v4();
        let (org, _) = svc
            .create_organization("Acme", PlanTier::Free, Uuid::new_v4())
            .await
            .unwrap();
        svc.add_member(org.id, member, "viewer").await.unwrap();

        let updated = svc.change_role(org.id, member, "manager").await.unwrap();
        assert_eq!(normalize(&updated.role), Some(CanonicalRole::Manager));

        svc.leave(org.id, member).await.unwrap();
        // Departed members can be re-added.
        svc.add_member(org.id, member, "employee").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_and_global_roles_are_rejected() {
        let svc = service();
        let (org, _) = svc
            .create_organization("Acme", PlanTier::Free, Uuid::new_v4())
            .await
            .unwrap();
        let err = svc
            .add_member(org.id, Uuid::new_v4(), "wizard")
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::InvalidRole(_)));
        let err = svc
            .add_member(org.id, Uuid::new_v4(), "superadmin")
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::InvalidRole(_)));
    }

    #[tokio::test]
    async fn concurrent_invite_acceptance_is_single_winner() {
        let svc = Arc::new(service());
        let user = Uuid::new_v4();
        let (org, _) = svc
            .create_organization("Acme", PlanTier::Free, Uuid::new_v4())
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            svc.add_member(org.id, user, "employee"),
            svc.add_member(org.id, user, "employee"),
        );
        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let duplicate = if first.is_err() { first } else { second };
        assert!(matches!(
            duplicate.unwrap_err(),
            TenancyError::DuplicateMembership
        ));
    }

    #[tokio::test]
    async fn suspended_members_lose_active_membership() {
        let svc = service();
        let member = Uuid::new_v4();
        let (org, _) = svc
            .create_organization("Acme", PlanTier::Free, Uuid::new_v4())
            .await
            .unwrap();
        svc.add_member(org.id, member, "employee").await.unwrap();
        svc.suspend_member(org.id, member).await.unwrap();

        let err = svc.change_role(org.id, member, "manager").await.unwrap_err();
        assert!(matches!(err, TenancyError::MembershipNotFound));
    }
}
