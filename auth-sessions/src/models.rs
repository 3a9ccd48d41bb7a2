use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable record of one refresh lineage.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Current rotation lineage id; replaced on every successful rotation.
    pub lineage_id: Uuid,
    /// Fingerprint of the currently valid refresh assertion. The raw value
    /// is never persisted.
    pub refresh_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub termination_reason: Option<String>,
}

impl Session {
    /// Storage-side validity check. Runs at read time regardless of what the
    /// signed assertion claims about its own lifetime.
    pub fn is_valid(&self) -> bool {
        self.active && self.terminated_at.is_none() && self.expires_at > Utc::now()
    }
}

/// Device descriptor captured at login and kept for the session list UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Input for opening a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub lineage_id: Uuid,
    pub refresh_hash: String,
    pub device: DeviceInfo,
    pub expires_at: DateTime<Utc>,
}

/// Replacement state written by one rotation.
#[derive(Debug, Clone)]
pub struct RotatedLineage {
    pub lineage_id: Uuid,
    pub refresh_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Credential pair handed back after login or rotation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access assertion lifetime in seconds.
    pub expires_in: i64,
}
