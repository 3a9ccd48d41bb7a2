use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{TenancyError, TenancyResult};
use crate::models::{Membership, MembershipStatus, Organization};

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Insert a new organization. Slug uniqueness is the storage layer's
    /// call; a duplicate surfaces as [`TenancyError::Database`] with a
    /// unique-violation code, which the service layer retries with a
    /// disambiguated slug.
    async fn create(&self, org: Organization) -> TenancyResult<Organization>;

    async fn find_by_id(&self, id: Uuid) -> TenancyResult<Option<Organization>>;

    async fn find_by_slug(&self, slug: &str) -> TenancyResult<Option<Organization>>;

    async fn soft_delete(&self, id: Uuid) -> TenancyResult<()>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Insert a membership. At most one live row per (user, organization);
    /// the duplicate case surfaces as [`TenancyError::DuplicateMembership`].
    async fn create(&self, membership: Membership) -> TenancyResult<Membership>;

    /// Live, active membership for (user, organization).
    async fn find_active(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> TenancyResult<Option<Membership>>;

    /// Active memberships for a user, oldest first. The head is the
    /// deterministic "first organization" default.
    async fn list_active_for_user(&self, user_id: Uuid) -> TenancyResult<Vec<Membership>>;

    async fn list_for_organization(&self, organization_id: Uuid)
        -> TenancyResult<Vec<Membership>>;

    async fn update_role(&self, membership_id: Uuid, role: &str) -> TenancyResult<()>;

    async fn update_status(
        &self,
        membership_id: Uuid,
        status: MembershipStatus,
    ) -> TenancyResult<()>;

    async fn soft_delete(&self, membership_id: Uuid) -> TenancyResult<()>;
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .as_deref()
        == Some("23505")
}

// =============================================================================
// POSTGRES IMPLEMENTATIONS
// =============================================================================

#[derive(Clone)]
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn create(&self, org: Organization) -> TenancyResult<Organization> {
        let row = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (id, name, slug, plan, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.slug)
        .bind(org.plan)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TenancyError::SlugTaken
            } else {
                TenancyError::Database(e)
            }
        })?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> TenancyResult<Option<Organization>> {
        let row = sqlx::query_as::<_, Organization>(
            r#"
            SELECT * FROM organizations
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_slug(&self, slug: &str) -> TenancyResult<Option<Organization>> {
        let row = sqlx::query_as::<_, Organization>(
            r#"
            SELECT * FROM organizations
            WHERE slug = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn soft_delete(&self, id: Uuid) -> TenancyResult<()> {
        sqlx::query(
            r#"
            UPDATE organizations
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn create(&self, membership: Membership) -> TenancyResult<Membership> {
        let row = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (
                id, user_id, organization_id, role, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.organization_id)
        .bind(&membership.role)
        .bind(membership.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TenancyError::DuplicateMembership
            } else {
                TenancyError::Database(e)
            }
        })?;
        Ok(row)
    }

    async fn find_active(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> TenancyResult<Option<Membership>> {
        let row = sqlx::query_as::<_, Membership>(
            r#"
            SELECT * FROM memberships
            WHERE user_id = $1
                AND organization_id = $2
                AND status = 'active'
                AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> TenancyResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, Membership>(
            r#"
            SELECT * FROM memberships
            WHERE user_id = $1 AND status = 'active' AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_for_organization(
        &self,
        organization_id: Uuid,
    ) -> TenancyResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, Membership>(
            r#"
            SELECT * FROM memberships
            WHERE organization_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_role(&self, membership_id: Uuid, role: &str) -> TenancyResult<()> {
        sqlx::query(
            r#"
            UPDATE memberships
            SET role = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(membership_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        membership_id: Uuid,
        status: MembershipStatus,
    ) -> TenancyResult<()> {
        sqlx::query(
            r#"
            UPDATE memberships
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(membership_id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn soft_delete(&self, membership_id: Uuid) -> TenancyResult<()> {
        sqlx::query(
            r#"
            UPDATE memberships
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(membership_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY IMPLEMENTATIONS (tests, local development)
// =============================================================================

#[derive(Default)]
pub struct InMemoryOrganizationRepository {
    organizations: RwLock<HashMap<Uuid, Organization>>,
}

impl InMemoryOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn create(&self, org: Organization) -> TenancyResult<Organization> {
        let mut organizations = self.organizations.write().await;
        // Mirror the storage unique index on slug.
        if organizations
            .values()
            .any(|o| o.deleted_at.is_none() && o.slug == org.slug)
        {
            return Err(TenancyError::SlugTaken);
        }
        organizations.insert(org.id, org.clone());
        Ok(org)
    }

    async fn find_by_id(&self, id: Uuid) -> TenancyResult<Option<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(&id)
            .filter(|o| o.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> TenancyResult<Option<Organization>> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .values()
            .find(|o| o.deleted_at.is_none() && o.slug == slug)
            .cloned())
    }

    async fn soft_delete(&self, id: Uuid) -> TenancyResult<()> {
        let mut organizations = self.organizations.write().await;
        if let Some(org) = organizations.get_mut(&id).filter(|o| o.deleted_at.is_none()) {
            org.deleted_at = Some(Utc::now());
            org.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMembershipRepository {
    memberships: RwLock<HashMap<Uuid, Membership>>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn create(&self, membership: Membership) -> TenancyResult<Membership> {
        let mut memberships = self.memberships.write().await;
        // The write lock stands in for the partial unique index: two
        // concurrent invite-acceptances cannot both pass this check.
        if memberships.values().any(|m| {
            m.deleted_at.is_none()
                && m.user_id == membership.user_id
                && m.organization_id == membership.organization_id
        }) {
            return Err(TenancyError::DuplicateMembership);
        }
        memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn find_active(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> TenancyResult<Option<Membership>> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .values()
            .find(|m| {
                m.user_id == user_id && m.organization_id == organization_id && m.is_active()
            })
            .cloned())
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> TenancyResult<Vec<Membership>> {
        let memberships = self.memberships.read().await;
        let mut rows: Vec<Membership> = memberships
            .values()
            .filter(|m| m.user_id == user_id && m.is_active())
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn list_for_organization(
        &self,
        organization_id: Uuid,
    ) -> TenancyResult<Vec<Membership>> {
        let memberships = self.memberships.read().await;
        let mut rows: Vec<Membership> = memberships
            .values()
            .filter(|m| m.organization_id == organization_id && m.deleted_at.is_none())
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn update_role(&self, membership_id: Uuid, role: &str) -> TenancyResult<()> {
        let mut memberships = self.memberships.write().await;
        if let Some(m) = memberships
            .get_mut(&membership_id)
            .filter(|m| m.deleted_at.is_none())
        {
            m.role = role.to_string();
            m.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_status(
        &self,
        membership_id: Uuid,
        status: MembershipStatus,
    ) -> TenancyResult<()> {
        let mut memberships = self.memberships.write().await;
        if let Some(m) = memberships
            .get_mut(&membership_id)
            .filter(|m| m.deleted_at.is_none())
        {
            m.status = status;
            m.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn soft_delete(&self, membership_id: Uuid) -> TenancyResult<()> {
        let mut memberships = self.memberships.write().await;
        if let Some(m) = memberships
            .get_mut(&membership_id)
            .filter(|m| m.deleted_at.is_none())
        {
            m.deleted_at = Some(Utc::now());
            m.updated_at = Utc::now();
        }
        Ok(())
    }
}
