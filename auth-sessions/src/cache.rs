use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

use crate::error::SessionResult;

/// Outcome of a cache pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCheck {
    /// Lineage marked valid. The session store's fingerprint comparison
    /// still runs: the cache may be momentarily stale.
    Valid,
    /// Lineage positively absent while the cache is healthy: it was
    /// superseded or revoked. Safe to fail fast.
    Revoked,
    /// Cache down or unreachable. Fail open into the authoritative store.
    Unavailable,
}

/// Fast existence-check in front of the session store.
///
/// Strictly an optimization: no answer from this interface may make an
/// otherwise-valid refresh fail while the backing service is unavailable,
/// and a `Valid` answer is never trusted on its own.
#[async_trait]
pub trait RevocationCache: Send + Sync {
    async fn mark_valid(&self, user_id: Uuid, lineage_id: Uuid, ttl_seconds: u64)
        -> SessionResult<()>;

    async fn invalidate(&self, user_id: Uuid, lineage_id: Uuid) -> SessionResult<()>;

    async fn invalidate_all(&self, user_id: Uuid) -> SessionResult<()>;

    async fn check(&self, user_id: Uuid, lineage_id: Uuid) -> CacheCheck;
}

// =============================================================================
// REDIS IMPLEMENTATION
// =============================================================================

#[derive(Clone)]
pub struct RedisRevocationCache {
    manager: ConnectionManager,
}

impl RedisRevocationCache {
    pub async fn connect(url: &str) -> SessionResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    fn key(user_id: Uuid, lineage_id: Uuid) -> String {
        format!("refresh:{}:{}", user_id, lineage_id)
    }

    fn user_pattern(user_id: Uuid) -> String {
        format!("refresh:{}:*", user_id)
    }
}

#[async_trait]
impl RevocationCache for RedisRevocationCache {
    async fn mark_valid(
        &self,
        user_id: Uuid,
        lineage_id: Uuid,
        ttl_seconds: u64,
    ) -> SessionResult<()> {
        let mut con = self.manager.clone();
        con.set_ex::<_, _, ()>(Self::key(user_id, lineage_id), 1u8, ttl_seconds)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, user_id: Uuid, lineage_id: Uuid) -> SessionResult<()> {
        let mut con = self.manager.clone();
        con.del::<_, ()>(Self::key(user_id, lineage_id)).await?;
        Ok(())
    }

    async fn invalidate_all(&self, user_id: Uuid) -> SessionResult<()> {
        let mut con = self.manager.clone();
        let keys: Vec<String> = con.keys(Self::user_pattern(user_id)).await?;
        if !keys.is_empty() {
            con.del::<_, ()>(keys).await?;
        }
        Ok(())
    }

    async fn check(&self, user_id: Uuid, lineage_id: Uuid) -> CacheCheck {
        let mut con = self.manager.clone();
        match con
            .get::<_, Option<u8>>(Self::key(user_id, lineage_id))
            .await
        {
            Ok(Some(_)) => CacheCheck::Valid,
            Ok(None) => CacheCheck::Revoked,
            Err(e) => {
                warn!(error = %e, "revocation cache unreachable, falling back to session store");
                CacheCheck::Unavailable
            }
        }
    }
}

// =============================================================================
// NO-OP IMPLEMENTATION
// =============================================================================

/// Stands in when no cache is configured. Every lookup falls through to the
/// session store, so callers never branch on "is the cache up".
#[derive(Debug, Default, Clone)]
pub struct NoopRevocationCache;

#[async_trait]
impl RevocationCache for NoopRevocationCache {
    async fn mark_valid(&self, _: Uuid, _: Uuid, _: u64) -> SessionResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _: Uuid, _: Uuid) -> SessionResult<()> {
        Ok(())
    }

    async fn invalidate_all(&self, _: Uuid) -> SessionResult<()> {
        Ok(())
    }

    async fn check(&self, _: Uuid, _: Uuid) -> CacheCheck {
        CacheCheck::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_cache_never_answers() {
        let cache = NoopRevocationCache;
        let user = Uuid::new_v4();
        let lineage = Uuid::new_v4();
        cache.mark_valid(user, lineage, 60).await.unwrap();
        assert_eq!(cache.check(user, lineage).await, CacheCheck::Unavailable);
        cache.invalidate(user, lineage).await.unwrap();
        cache.invalidate_all(user).await.unwrap();
    }
}
