use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::SessionResult;
use crate::models::{NewSession, RotatedLineage, Session};

/// Storage operations for refresh lineages.
///
/// `rotate` is the critical one: it must be an atomic conditional update so
/// that two near-simultaneous refresh calls cannot both succeed. No process
/// level lock is held across any of these calls.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: NewSession) -> SessionResult<Session>;

    async fn find_by_lineage(&self, lineage_id: Uuid) -> SessionResult<Option<Session>>;

    /// Atomically supersede a lineage. Succeeds only if the stored lineage
    /// id and fingerprint still match the presented pair and the session is
    /// live; returns `false` when the compare fails (a concurrent rotation
    /// already won).
    async fn rotate(
        &self,
        lineage_id: Uuid,
        current_hash: &str,
        next: RotatedLineage,
    ) -> SessionResult<bool>;

    async fn terminate_by_lineage(&self, lineage_id: Uuid, reason: &str) -> SessionResult<()>;

    async fn terminate_all_for_user(&self, user_id: Uuid, reason: &str) -> SessionResult<u64>;

    /// Live sessions for the session-management UI, most recent first.
    async fn list_for_user(&self, user_id: Uuid) -> SessionResult<Vec<Session>>;

    async fn touch_activity(&self, session_id: Uuid) -> SessionResult<()>;

    /// Housekeeping; expiry is also enforced at read time.
    async fn cleanup_expired(&self) -> SessionResult<u64>;
}

// =============================================================================
// POSTGRES IMPLEMENTATION
// =============================================================================

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: NewSession) -> SessionResult<Session> {
        let row = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                id, user_id, lineage_id, refresh_hash, user_agent, ip_address,
                active, created_at, last_activity_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW(), NOW(), $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session.user_id)
        .bind(session.lineage_id)
        .bind(&session.refresh_hash)
        .bind(&session.device.user_agent)
        .bind(&session.device.ip_address)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_lineage(&self, lineage_id: Uuid) -> SessionResult<Option<Session>> {
        let row = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE lineage_id = $1
            "#,
        )
        .bind(lineage_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn rotate(
        &self,
        lineage_id: Uuid,
        current_hash: &str,
        next: RotatedLineage,
    ) -> SessionResult<bool> {
        // Single conditional update: the compare and the swap happen in one
        // statement, so the per-row write lock decides races.
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET
                lineage_id = $3,
                refresh_hash = $4,
                expires_at = $5,
                last_activity_at = NOW()
            WHERE lineage_id = $1
                AND refresh_hash = $2
                AND active = TRUE
                AND terminated_at IS NULL
            "#,
        )
        .bind(lineage_id)
        .bind(current_hash)
        .bind(next.lineage_id)
        .bind(&next.refresh_hash)
        .bind(next.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn terminate_by_lineage(&self, lineage_id: Uuid, reason: &str) -> SessionResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET active = FALSE, terminated_at = NOW(), termination_reason = $2
            WHERE lineage_id = $1 AND active = TRUE
            "#,
        )
        .bind(lineage_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn terminate_all_for_user(&self, user_id: Uuid, reason: &str) -> SessionResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET active = FALSE, terminated_at = NOW(), termination_reason = $2
            WHERE user_id = $1 AND active = TRUE
            "#,
        )
        .bind(user_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_for_user(&self, user_id: Uuid) -> SessionResult<Vec<Session>> {
        let rows = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1
                AND active = TRUE
                AND terminated_at IS NULL
                AND expires_at > NOW()
            ORDER BY last_activity_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn touch_activity(&self, session_id: Uuid) -> SessionResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET last_activity_at = NOW()
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cleanup_expired(&self) -> SessionResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET active = FALSE, terminated_at = NOW(), termination_reason = 'expired'
            WHERE expires_at < NOW() AND active = TRUE
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION (tests, local development)
// =============================================================================

/// Keeps all sessions behind one write lock; the lock plays the role of the
/// database's per-row serialization for `rotate`.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: NewSession) -> SessionResult<Session> {
        let now = Utc::now();
        let row = Session {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            lineage_id: session.lineage_id,
            refresh_hash: session.refresh_hash,
            user_agent: session.device.user_agent,
            ip_address: session.device.ip_address,
            active: true,
            created_at: now,
            last_activity_at: now,
            expires_at: session.expires_at,
            terminated_at: None,
            termination_reason: None,
        };
        self.sessions.write().await.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_lineage(&self, lineage_id: Uuid) -> SessionResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|s| s.lineage_id == lineage_id)
            .cloned())
    }

    async fn rotate(
        &self,
        lineage_id: Uuid,
        current_hash: &str,
        next: RotatedLineage,
    ) -> SessionResult<bool> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.values_mut().find(|s| {
            s.lineage_id == lineage_id
                && s.refresh_hash == current_hash
                && s.active
                && s.terminated_at.is_none()
        }) else {
            return Ok(false);
        };
        session.lineage_id = next.lineage_id;
        session.refresh_hash = next.refresh_hash;
        session.expires_at = next.expires_at;
        session.last_activity_at = Utc::now();
        Ok(true)
    }

    async fn terminate_by_lineage(&self, lineage_id: Uuid, reason: &str) -> SessionResult<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions
            .values_mut()
            .find(|s| s.lineage_id == lineage_id && s.active)
        {
            session.active = false;
            session.terminated_at = Some(Utc::now());
            session.termination_reason = Some(reason.to_string());
        }
        Ok(())
    }

    async fn terminate_all_for_user(&self, user_id: Uuid, reason: &str) -> SessionResult<u64> {
        let mut sessions = self.sessions.write().await;
        let mut count = 0;
        for session in sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.active)
        {
            session.active = false;
            session.terminated_at = Some(Utc::now());
            session.termination_reason = Some(reason.to_string());
            count += 1;
        }
        Ok(count)
    }

    async fn list_for_user(&self, user_id: Uuid) -> SessionResult<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut rows: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_valid())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(rows)
    }

    async fn touch_activity(&self, session_id: Uuid) -> SessionResult<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.last_activity_at = Utc::now();
        }
        Ok(())
    }

    async fn cleanup_expired(&self) -> SessionResult<u64> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let mut count = 0;
        for session in sessions
            .values_mut()
            .filter(|s| s.active && s.expires_at < now)
        {
            session.active = false;
            session.terminated_at = Some(now);
            session.termination_reason = Some("expired".to_string());
            count += 1;
        }
        Ok(count)
    }
}
