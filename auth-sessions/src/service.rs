use std::sync::Arc;

use auth_tokens::{RefreshClaims, TokenService};
use chrono::{Duration, Utc};
use error_core::detach;
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

use crate::cache::{CacheCheck, RevocationCache};
use crate::error::{SessionError, SessionResult};
use crate::models::{DeviceInfo, NewSession, RotatedLineage, Session, SessionTokens};
use crate::repository::SessionRepository;

/// Session lifecycle: open on login, rotate on refresh, close on logout.
///
/// Ordering inside one rotation: the new session state is durably written
/// before the new pair is returned. The cache writes are best-effort
/// detached tasks and may lag; the store write is not.
pub struct SessionService {
    repo: Arc<dyn SessionRepository>,
    cache: Arc<dyn RevocationCache>,
    tokens: Arc<TokenService>,
}

impl SessionService {
    pub fn new(
        repo: Arc<dyn SessionRepository>,
        cache: Arc<dyn RevocationCache>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self { repo, cache, tokens }
    }

    /// Open a new session and mint the initial credential pair.
    pub async fn open(
        &self,
        user_id: Uuid,
        email: &str,
        device: DeviceInfo,
    ) -> SessionResult<SessionTokens> {
        let (refresh_token, lineage_id) = self.tokens.issue_refresh(user_id, email)?;
        let refresh_hash = TokenService::refresh_fingerprint(&refresh_token);
        let expires_at = Utc::now() + Duration::seconds(self.tokens.refresh_ttl_seconds());

        self.repo
            .create(NewSession {
                user_id,
                lineage_id,
                refresh_hash,
                device,
                expires_at,
            })
            .await?;
        self.cache_mark(user_id, lineage_id);

        let access_token = self.tokens.issue_access(user_id, email)?;
        Ok(SessionTokens {
            access_token,
            refresh_token,
            expires_in: self.tokens.access_ttl_seconds(),
        })
    }

    /// Rotate a verified refresh assertion into a new pair.
    ///
    /// The caller has already checked the signature and confirmed the
    /// identity is live. The stored fingerprint comparison is authoritative
    /// and runs even when the cache pre-check answered `Valid`.
    pub async fn rotate(
        &self,
        claims: &RefreshClaims,
        presented: &str,
    ) -> SessionResult<SessionTokens> {
        let user_id = claims.user_id().map_err(|_| SessionError::Revoked)?;
        let lineage_id = claims.lineage_id().map_err(|_| SessionError::Revoked)?;

        // Fast pre-check only; never the final word on validity.
        if self.cache.check(user_id, lineage_id).await == CacheCheck::Revoked {
            return Err(SessionError::Revoked);
        }

        let session = self
            .repo
            .find_by_lineage(lineage_id)
            .await?
            .ok_or(SessionError::Revoked)?;
        if session.user_id != user_id || !session.is_valid() {
            return Err(SessionError::Revoked);
        }

        let presented_hash = TokenService::refresh_fingerprint(presented);
        if !fingerprints_match(&presented_hash, &session.refresh_hash) {
            // A live lineage with a stale value: the assertion was already
            // spent or stolen. Kill the lineage outright.
            self.repo
                .terminate_by_lineage(lineage_id, "refresh replay detected")
                .await?;
            self.cache_invalidate(user_id, lineage_id);
            warn!(%user_id, %lineage_id, "refresh assertion replay detected, lineage terminated");
            return Err(SessionError::Replayed);
        }

        let (refresh_token, next_lineage) = self.tokens.issue_refresh(user_id, &claims.email)?;
        let next = RotatedLineage {
            lineage_id: next_lineage,
            refresh_hash: TokenService::refresh_fingerprint(&refresh_token),
            expires_at: Utc::now() + Duration::seconds(self.tokens.refresh_ttl_seconds()),
        };

        let swapped = self
            .repo
            .rotate(lineage_id, &session.refresh_hash, next)
            .await?;
        if !swapped {
            // Lost the swap to a concurrent rotation of the same lineage.
            warn!(%user_id, %lineage_id, "concurrent rotation lost the conditional update");
            return Err(SessionError::Replayed);
        }

        self.cache_invalidate(user_id, lineage_id);
        self.cache_mark(user_id, next_lineage);

        let access_token = self.tokens.issue_access(user_id, &claims.email)?;
        Ok(SessionTokens {
            access_token,
            refresh_token,
            expires_in: self.tokens.access_ttl_seconds(),
        })
    }

    /// Terminate a single session (logout).
    pub async fn close(&self, user_id: Uuid, lineage_id: Uuid, reason: &str) -> SessionResult<()> {
        self.repo.terminate_by_lineage(lineage_id, reason).await?;
        self.cache_invalidate(user_id, lineage_id);
        Ok(())
    }

    /// Terminate every session for an identity (logout-all, deactivation).
    pub async fn close_all(&self, user_id: Uuid, reason: &str) -> SessionResult<u64> {
        let count = self.repo.terminate_all_for_user(user_id, reason).await?;
        let cache = self.cache.clone();
        detach("revocation-cache-clear", async move {
            cache.invalidate_all(user_id).await
        });
        Ok(count)
    }

    /// Live sessions for the session-management UI.
    pub async fn sessions_for(&self, user_id: Uuid) -> SessionResult<Vec<Session>> {
        self.repo.list_for_user(user_id).await
    }

    fn cache_mark(&self, user_id: Uuid, lineage_id: Uuid) {
        let cache = self.cache.clone();
        let ttl = self.tokens.refresh_ttl_seconds().max(0) as u64;
        detach("revocation-cache-set", async move {
            cache.mark_valid(user_id, lineage_id, ttl).await
        });
    }

    fn cache_invalidate(&self, user_id: Uuid, lineage_id: Uuid) {
        let cache = self.cache.clone();
        detach("revocation-cache-del", async move {
            cache.invalidate(user_id, lineage_id).await
        });
    }
}

fn fingerprints_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
