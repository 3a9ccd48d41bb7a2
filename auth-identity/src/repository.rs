use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{IdentityError, IdentityResult};
use crate::models::User;

/// Storage operations for user records.
///
/// Every query implicitly excludes tombstoned rows; soft deletion is a
/// repository convention, not something call sites remember to check.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Email uniqueness is enforced by the storage layer;
    /// a duplicate surfaces as [`IdentityError::EmailAlreadyInUse`].
    async fn create(&self, user: User) -> IdentityResult<User>;

    async fn find_by_id(&self, id: Uuid) -> IdentityResult<Option<User>>;

    /// Lookup by lowercase email.
    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<User>>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> IdentityResult<()>;

    async fn set_last_login(&self, id: Uuid) -> IdentityResult<()>;

    async fn deactivate(&self, id: Uuid) -> IdentityResult<()>;

    async fn soft_delete(&self, id: Uuid) -> IdentityResult<()>;
}

// =============================================================================
// POSTGRES IMPLEMENTATION
// =============================================================================

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .as_deref()
        == Some("23505")
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> IdentityResult<User> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, password_hash, full_name, is_active, is_super_admin,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.is_super_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                IdentityError::EmailAlreadyInUse
            } else {
                IdentityError::Database(e)
            }
        })?;
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> IdentityResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> IdentityResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_last_login(&self, id: Uuid) -> IdentityResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> IdentityResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> IdentityResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_active = FALSE, deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION (tests, local development)
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> IdentityResult<User> {
        let mut users = self.users.write().await;
        // The write lock stands in for the unique index: concurrent
        // registrations with the same email cannot both pass this check.
        if users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email == user.email)
        {
            return Err(IdentityError::EmailAlreadyInUse);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> IdentityResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> IdentityResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email == email)
            .cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> IdentityResult<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_last_login(&self, id: Uuid) -> IdentityResult<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> IdentityResult<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            user.is_active = false;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> IdentityResult<()> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id).filter(|u| u.deleted_at.is_none()) {
            user.is_active = false;
            user.deleted_at = Some(Utc::now());
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}
