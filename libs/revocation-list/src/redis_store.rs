//! Redis revocation backend
//!
//! Entries live at `{namespace}:revoked:{sha256}` with `SET ... EX`, so Redis
//! expires them in lockstep with the tokens they shadow. Blocking callers go
//! through [`RedisRevocations`] and a plain client; suspension-mode callers
//! use [`AsyncRedisRevocations`] over a shared connection manager.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Commands};
use tracing::debug;

use crate::{AsyncRevocationBackend, Result, RevocationBackend, DEFAULT_ENTRY_TTL};

fn entry_key(namespace: &str, token_hash: &str) -> String {
    format!("{namespace}:revoked:{token_hash}")
}

fn ttl_seconds(ttl: Option<Duration>) -> u64 {
    ttl.unwrap_or(DEFAULT_ENTRY_TTL).as_secs().max(1)
}

pub struct RedisRevocations {
    client: redis::Client,
    namespace: String,
}

impl RedisRevocations {
    pub fn new(client: redis::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

impl RevocationBackend for RedisRevocations {
    fn insert(&self, token_hash: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.client.get_connection()?;
        let seconds = ttl_seconds(ttl);
        let _: () = conn.set_ex(entry_key(&self.namespace, token_hash), 1u8, seconds)?;
        debug!(ttl = seconds, "revocation entry written to redis");
        Ok(())
    }

    fn remove(&self, token_hash: &str) -> Result<()> {
        let mut conn = self.client.get_connection()?;
        let _: () = conn.del(entry_key(&self.namespace, token_hash))?;
        Ok(())
    }

    fn contains(&self, token_hash: &str) -> Result<bool> {
        let mut conn = self.client.get_connection()?;
        Ok(conn.exists(entry_key(&self.namespace, token_hash))?)
    }
}

pub struct AsyncRedisRevocations {
    redis: ConnectionManager,
    namespace: String,
}

impl AsyncRedisRevocations {
    pub fn new(redis: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            redis,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl AsyncRevocationBackend for AsyncRedisRevocations {
    async fn insert(&self, token_hash: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.redis.clone();
        let seconds = ttl_seconds(ttl);
        let _: () = conn
            .set_ex(entry_key(&self.namespace, token_hash), 1u8, seconds)
            .await?;
        debug!(ttl = seconds, "revocation entry written to redis");
        Ok(())
    }

    async fn remove(&self, token_hash: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: () = conn.del(entry_key(&self.namespace, token_hash)).await?;
        Ok(())
    }

    async fn contains(&self, token_hash: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        Ok(conn
            .exists(entry_key(&self.namespace, token_hash))
            .await?)
    }
}
