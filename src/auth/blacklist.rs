/// Token Blacklist
///
/// Expiring set membership for revoked token ids. An entry lives only as
/// long as the token it revokes could still be valid, so absence means
/// "not revoked", never "never revoked". This is a security control: a
/// backend failure is an error for the caller to fail closed on, never a
/// silent "not revoked".

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::auth::claims::TokenClass;
use crate::error::StoreError;

/// Storage key for a revocation entry
pub fn blacklist_key(jti: Uuid, class: TokenClass) -> String {
    format!("bl:{}:{}", class, jti)
}

/// Entries always live at least one second; a zero TTL would either be
/// rejected by the backend or never be visible.
pub(crate) fn effective_ttl(ttl_seconds: u64) -> u64 {
    ttl_seconds.max(1)
}

#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Mark `(class, jti)` revoked for `ttl_seconds`.
    async fn revoke(&self, jti: Uuid, class: TokenClass, ttl_seconds: u64)
        -> Result<(), StoreError>;

    /// Mark `(class, jti)` revoked only if it is not already. Returns
    /// whether this call created the entry.
    async fn revoke_once(
        &self,
        jti: Uuid,
        class: TokenClass,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError>;

    async fn is_revoked(&self, jti: Uuid, class: TokenClass) -> Result<bool, StoreError>;
}

/// Process-local blacklist. Entries expire lazily on read and are swept by
/// `purge_expired`.
#[derive(Clone, Default)]
pub struct InMemoryBlacklist {
    entries: Arc<RwLock<HashMap<String, Instant>>>,
}

impl InMemoryBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, deadline| *deadline > now);
        before - entries.len()
    }

    /// Number of entries currently held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn a task that purges expired entries every `period`.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let blacklist = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = blacklist.purge_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired blacklist entries");
                }
            }
        })
    }
}

#[async_trait]
impl TokenBlacklist for InMemoryBlacklist {
    async fn revoke(
        &self,
        jti: Uuid,
        class: TokenClass,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let deadline = Instant::now() + Duration::from_secs(effective_ttl(ttl_seconds));
        let mut entries = self.entries.write().await;
        entries.insert(blacklist_key(jti, class), deadline);
        Ok(())
    }

    async fn revoke_once(
        &self,
        jti: Uuid,
        class: TokenClass,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let key = blacklist_key(jti, class);
        let mut entries = self.entries.write().await;

        if matches!(entries.get(&key), Some(deadline) if *deadline > now) {
            return Ok(false);
        }

        entries.insert(key, now + Duration::from_secs(effective_ttl(ttl_seconds)));
        Ok(true)
    }

    async fn is_revoked(&self, jti: Uuid, class: TokenClass) -> Result<bool, StoreError> {
        let entries = self.entries.read().await;
        Ok(matches!(
            entries.get(&blacklist_key(jti, class)),
            Some(deadline) if *deadline > Instant::now()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let jti = Uuid::parse_str("6f1d2c9e-6a4b-4bd8-9d55-0c7a1e0f3b21").unwrap();
        assert_eq!(
            blacklist_key(jti, TokenClass::Refresh),
            "bl:refresh:6f1d2c9e-6a4b-4bd8-9d55-0c7a1e0f3b21"
        );
        assert_eq!(
            blacklist_key(jti, TokenClass::Access),
            "bl:access:6f1d2c9e-6a4b-4bd8-9d55-0c7a1e0f3b21"
        );
    }

    #[tokio::test]
    async fn test_revoke_is_scoped_to_class() {
        let blacklist = InMemoryBlacklist::new();
        let jti = Uuid::new_v4();

        blacklist.revoke(jti, TokenClass::Refresh, 60).await.unwrap();

        assert!(blacklist.is_revoked(jti, TokenClass::Refresh).await.unwrap());
        assert!(!blacklist.is_revoked(jti, TokenClass::Access).await.unwrap());
        assert!(!blacklist
            .is_revoked(Uuid::new_v4(), TokenClass::Refresh)
            .await
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let blacklist = InMemoryBlacklist::new();
        let jti = Uuid::new_v4();

        blacklist.revoke(jti, TokenClass::Access, 30).await.unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(blacklist.is_revoked(jti, TokenClass::Access).await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!blacklist.is_revoked(jti, TokenClass::Access).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_still_visible_briefly() {
        let blacklist = InMemoryBlacklist::new();
        let jti = Uuid::new_v4();

        blacklist.revoke(jti, TokenClass::Refresh, 0).await.unwrap();
        assert!(blacklist.is_revoked(jti, TokenClass::Refresh).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_once_only_first_wins() {
        let blacklist = InMemoryBlacklist::new();
        let jti = Uuid::new_v4();

        assert!(blacklist.revoke_once(jti, TokenClass::Refresh, 60).await.unwrap());
        assert!(!blacklist.revoke_once(jti, TokenClass::Refresh, 60).await.unwrap());
        assert!(blacklist.is_revoked(jti, TokenClass::Refresh).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_once_after_expiry_succeeds_again() {
        let blacklist = InMemoryBlacklist::new();
        let jti = Uuid::new_v4();

        assert!(blacklist.revoke_once(jti, TokenClass::Refresh, 5).await.unwrap());
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(blacklist.revoke_once(jti, TokenClass::Refresh, 5).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let blacklist = InMemoryBlacklist::new();

        blacklist.revoke(Uuid::new_v4(), TokenClass::Access, 10).await.unwrap();
        blacklist.revoke(Uuid::new_v4(), TokenClass::Refresh, 100).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(blacklist.purge_expired().await, 1);
        assert_eq!(blacklist.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let blacklist = InMemoryBlacklist::new();
        blacklist.revoke(Uuid::new_v4(), TokenClass::Access, 1).await.unwrap();

        let sweeper = blacklist.spawn_sweeper(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(blacklist.is_empty().await);
        sweeper.abort();
    }
}
