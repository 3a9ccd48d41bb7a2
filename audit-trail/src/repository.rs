use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entry::AuditEntry;
use crate::error::AuditResult;

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> AuditResult<()>;

    /// Recent entries for one organization, newest first.
    async fn list_for_organization(
        &self,
        organization_id: Uuid,
        limit: i64,
    ) -> AuditResult<Vec<AuditEntry>>;

    /// Delete entries past their retention expiry.
    async fn purge_expired(&self) -> AuditResult<u64>;
}

// =============================================================================
// POSTGRES IMPLEMENTATION
// =============================================================================

#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, organization_id, actor_id, action, entity_type, entity_id,
                before, after, ip_address, user_agent, recorded_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.id)
        .bind(entry.organization_id)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.before)
        .bind(&entry.after)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.recorded_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_organization(
        &self,
        organization_id: Uuid,
        limit: i64,
    ) -> AuditResult<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE organization_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(organization_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn purge_expired(&self) -> AuditResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM audit_log
            WHERE expires_at < NOW()
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

#[derive(Default)]
pub struct InMemoryAuditRepository {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn list_for_organization(
        &self,
        organization_id: Uuid,
        limit: i64,
    ) -> AuditResult<Vec<AuditEntry>> {
        let entries = self.entries.lock().await;
        let mut rows: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| e.organization_id == Some(organization_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn purge_expired(&self) -> AuditResult<u64> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| e.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}
