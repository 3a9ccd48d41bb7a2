use std::sync::Arc;

use chrono::{Duration, Utc};
use error_core::detach;
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use crate::entry::AuditEntry;
use crate::error::AuditResult;
use crate::repository::AuditRepository;

const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "password_hash",
    "access_token",
    "refresh_token",
    "refresh_hash",
    "secret",
    "api_key",
];

/// Appends audit records off the request path.
pub struct AuditRecorder {
    repo: Arc<dyn AuditRepository>,
    retention_days: i64,
    enabled: bool,
}

impl AuditRecorder {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self {
            repo,
            retention_days: 365,
            enabled: true,
        }
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Fire-and-forget append. Must never block or fail the primary
    /// request: the write runs detached, and a failure is logged and
    /// swallowed.
    pub fn record(&self, mut entry: AuditEntry) {
        if !self.enabled {
            return;
        }

        entry.recorded_at = Utc::now();
        entry.expires_at = entry.recorded_at + Duration::days(self.retention_days);
        entry.before = entry.before.take().map(redact_sensitive_fields);
        entry.after = entry.after.take().map(redact_sensitive_fields);

        info!(
            target: "audit",
            actor_id = ?entry.actor_id,
            organization_id = ?entry.organization_id,
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = ?entry.entity_id,
            "audit event"
        );

        let repo = self.repo.clone();
        detach("audit-append", async move { repo.append(&entry).await });
    }

    /// Retention housekeeping, run from a scheduler.
    pub async fn purge_expired(&self) -> AuditResult<u64> {
        let deleted = self.repo.purge_expired().await?;
        info!(
            target: "audit",
            deleted_count = deleted,
            retention_days = self.retention_days,
            "purged expired audit records"
        );
        Ok(deleted)
    }

    pub async fn recent_for_organization(
        &self,
        organization_id: Uuid,
        limit: i64,
    ) -> AuditResult<Vec<AuditEntry>> {
        self.repo.list_for_organization(organization_id, limit).await
    }
}

fn redact_sensitive_fields(mut value: JsonValue) -> JsonValue {
    if let Some(obj) = value.as_object_mut() {
        for field in SENSITIVE_FIELDS {
            if obj.contains_key(*field) {
                obj.insert(
                    field.to_string(),
                    JsonValue::String("***REDACTED***".to_string()),
                );
            }
        }
    }
    value
}
