/// Redis-backed token blacklist
///
/// One key per revoked token, `SET ... EX` so Redis expires it on its own.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use uuid::Uuid;

use crate::auth::blacklist::{blacklist_key, effective_ttl, TokenBlacklist};
use crate::auth::claims::TokenClass;
use crate::error::StoreError;

#[derive(Clone)]
pub struct RedisBlacklist {
    connection: MultiplexedConnection,
}

impl RedisBlacklist {
    /// Connect to the Redis instance at `url`.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the URL is invalid or the server
    /// cannot be reached
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| {
            tracing::error!("Failed to parse Redis URL: {}", e);
            StoreError::from(e)
        })?;

        let connection = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to Redis blacklist");

        Ok(Self { connection })
    }
}

#[async_trait]
impl TokenBlacklist for RedisBlacklist {
    async fn revoke(
        &self,
        jti: Uuid,
        class: TokenClass,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(blacklist_key(jti, class))
            .arg(1)
            .arg("EX")
            .arg(effective_ttl(ttl_seconds))
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!(jti = %jti, class = %class, ttl_seconds, "Token revoked");
        Ok(())
    }

    async fn revoke_once(
        &self,
        jti: Uuid,
        class: TokenClass,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        // Nil reply when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(blacklist_key(jti, class))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(effective_ttl(ttl_seconds))
            .query_async(&mut conn)
            .await?;

        Ok(reply.is_some())
    }

    async fn is_revoked(&self, jti: Uuid, class: TokenClass) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(blacklist_key(jti, class))
            .query_async(&mut conn)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_store_error() {
        let result = RedisBlacklist::connect("not-a-redis-url").await;
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }
}
