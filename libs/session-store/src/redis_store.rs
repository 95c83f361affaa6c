//! Redis session backend
//!
//! Each session lives at `{namespace}:sess:{session_key}:{id}` with the
//! store TTL applied through `SET ... EX`, and an index set at
//! `{namespace}:idx:{session_key}` tracks live ids for `clear`. The internal
//! id embeds the session key, so `get` is a single round trip. Blocking
//! callers go through [`RedisSessions`] and a plain client; suspension-mode
//! callers use [`AsyncRedisSessions`] over a shared connection manager.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Commands};
use tracing::debug;

use crate::{
    AsyncSessionBackend, Result, SessionBackend, SessionConfig, SessionData, SessionError,
};

fn entry_key(namespace: &str, internal_id: &str) -> String {
    format!("{namespace}:sess:{internal_id}")
}

fn index_key(namespace: &str, session_key: &str) -> String {
    format!("{namespace}:idx:{session_key}")
}

/// The session key is everything before the trailing random segment
fn session_key_of(internal_id: &str) -> Result<&str> {
    internal_id
        .rsplit_once(':')
        .map(|(key, _)| key)
        .ok_or(SessionError::NotFound)
}

fn ttl_seconds(config: &SessionConfig) -> Option<u64> {
    config.ttl.map(|ttl| ttl.as_secs().max(1))
}

pub struct RedisSessions {
    client: redis::Client,
    namespace: String,
    config: SessionConfig,
}

impl RedisSessions {
    pub fn new(client: redis::Client, namespace: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            config,
        }
    }
}

impl SessionBackend for RedisSessions {
    fn create(&self, session_key: &str, data: &SessionData) -> Result<String> {
        let internal = format!("{session_key}:{}", self.config.new_internal_id());
        let payload = serde_json::to_string(data)?;

        let mut conn = self.client.get_connection()?;
        match ttl_seconds(&self.config) {
            Some(seconds) => {
                let _: () = conn.set_ex(entry_key(&self.namespace, &internal), payload, seconds)?;
            }
            None => {
                let _: () = conn.set(entry_key(&self.namespace, &internal), payload)?;
            }
        }
        let _: () = conn.sadd(index_key(&self.namespace, session_key), &internal)?;
        debug!(namespace = %self.namespace, "session created in redis");
        self.config.external_id(&internal)
    }

    fn get(&self, id: &str) -> Result<SessionData> {
        let internal = self.config.internal_id(id)?;
        let mut conn = self.client.get_connection()?;
        let payload: Option<String> = conn.get(entry_key(&self.namespace, &internal))?;
        let payload = payload.ok_or(SessionError::NotFound)?;
        Ok(serde_json::from_str(&payload)?)
    }

    fn update(&self, id: &str, data: &SessionData) -> Result<()> {
        let internal = self.config.internal_id(id)?;
        let key = entry_key(&self.namespace, &internal);

        let mut conn = self.client.get_connection()?;
        let exists: bool = conn.exists(&key)?;
        if !exists {
            return Err(SessionError::NotFound);
        }
        let payload = serde_json::to_string(data)?;
        match ttl_seconds(&self.config) {
            Some(seconds) => {
                let _: () = conn.set_ex(&key, payload, seconds)?;
            }
            None => {
                let _: () = conn.set(&key, payload)?;
            }
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let internal = self.config.internal_id(id)?;
        let session_key = session_key_of(&internal)?.to_string();

        let mut conn = self.client.get_connection()?;
        let _: () = conn.del(entry_key(&self.namespace, &internal))?;
        let _: () = conn.srem(index_key(&self.namespace, &session_key), &internal)?;
        Ok(())
    }

    fn clear(&self, session_key: &str) -> Result<()> {
        let index = index_key(&self.namespace, session_key);
        let mut conn = self.client.get_connection()?;
        let members: Vec<String> = conn.smembers(&index)?;
        for internal in &members {
            let _: () = conn.del(entry_key(&self.namespace, internal))?;
        }
        let _: () = conn.del(&index)?;
        debug!(namespace = %self.namespace, cleared = members.len(), "sessions cleared");
        Ok(())
    }

    fn rotate(&self, id: &str) -> Result<String> {
        let internal = self.config.internal_id(id)?;
        let session_key = session_key_of(&internal)?.to_string();

        let mut conn = self.client.get_connection()?;
        let payload: Option<String> = conn.get(entry_key(&self.namespace, &internal))?;
        let payload = payload.ok_or(SessionError::NotFound)?;

        let fresh = format!("{session_key}:{}", self.config.new_internal_id());
        match ttl_seconds(&self.config) {
            Some(seconds) => {
                let _: () = conn.set_ex(entry_key(&self.namespace, &fresh), &payload, seconds)?;
            }
            None => {
                let _: () = conn.set(entry_key(&self.namespace, &fresh), &payload)?;
            }
        }
        let index = index_key(&self.namespace, &session_key);
        let _: () = conn.sadd(&index, &fresh)?;
        let _: () = conn.del(entry_key(&self.namespace, &internal))?;
        let _: () = conn.srem(&index, &internal)?;
        self.config.external_id(&fresh)
    }
}

pub struct AsyncRedisSessions {
    redis: ConnectionManager,
    namespace: String,
    config: SessionConfig,
}

impl AsyncRedisSessions {
    pub fn new(
        redis: ConnectionManager,
        namespace: impl Into<String>,
        config: SessionConfig,
    ) -> Self {
        Self {
            redis,
            namespace: namespace.into(),
            config,
        }
    }
}

#[async_trait]
impl AsyncSessionBackend for AsyncRedisSessions {
    async fn create(&self, session_key: &str, data: &SessionData) -> Result<String> {
        let internal = format!("{session_key}:{}", self.config.new_internal_id());
        let payload = serde_json::to_string(data)?;

        let mut conn = self.redis.clone();
        match ttl_seconds(&self.config) {
            Some(seconds) => {
                let _: () = conn
                    .set_ex(entry_key(&self.namespace, &internal), payload, seconds)
                    .await?;
            }
            None => {
                let _: () = conn
                    .set(entry_key(&self.namespace, &internal), payload)
                    .await?;
            }
        }
        let _: () = conn
            .sadd(index_key(&self.namespace, session_key), &internal)
            .await?;
        debug!(namespace = %self.namespace, "session created in redis");
        self.config.external_id(&internal)
    }

    async fn get(&self, id: &str) -> Result<SessionData> {
        let internal = self.config.internal_id(id)?;
        let mut conn = self.redis.clone();
        let payload: Option<String> = conn.get(entry_key(&self.namespace, &internal)).await?;
        let payload = payload.ok_or(SessionError::NotFound)?;
        Ok(serde_json::from_str(&payload)?)
    }

    async fn update(&self, id: &str, data: &SessionData) -> Result<()> {
        let internal = self.config.internal_id(id)?;
        let key = entry_key(&self.namespace, &internal);

        let mut conn = self.redis.clone();
        let exists: bool = conn.exists(&key).await?;
        if !exists {
            return Err(SessionError::NotFound);
        }
        let payload = serde_json::to_string(data)?;
        match ttl_seconds(&self.config) {
            Some(seconds) => {
                let _: () = conn.set_ex(&key, payload, seconds).await?;
            }
            None => {
                let _: () = conn.set(&key, payload).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let internal = self.config.internal_id(id)?;
        let session_key = session_key_of(&internal)?.to_string();

        let mut conn = self.redis.clone();
        let _: () = conn.del(entry_key(&self.namespace, &internal)).await?;
        let _: () = conn
            .srem(index_key(&self.namespace, &session_key), &internal)
            .await?;
        Ok(())
    }

    async fn clear(&self, session_key: &str) -> Result<()> {
        let index = index_key(&self.namespace, session_key);
        let mut conn = self.redis.clone();
        let members: Vec<String> = conn.smembers(&index).await?;
        for internal in &members {
            let _: () = conn.del(entry_key(&self.namespace, internal)).await?;
        }
        let _: () = conn.del(&index).await?;
        debug!(namespace = %self.namespace, cleared = members.len(), "sessions cleared");
        Ok(())
    }

    async fn rotate(&self, id: &str) -> Result<String> {
        let internal = self.config.internal_id(id)?;
        let session_key = session_key_of(&internal)?.to_string();

        let mut conn = self.redis.clone();
        let payload: Option<String> = conn.get(entry_key(&self.namespace, &internal)).await?;
        let payload = payload.ok_or(SessionError::NotFound)?;

        let fresh = format!("{session_key}:{}", self.config.new_internal_id());
        match ttl_seconds(&self.config) {
            Some(seconds) => {
                let _: () = conn
                    .set_ex(entry_key(&self.namespace, &fresh), &payload, seconds)
                    .await?;
            }
            None => {
                let _: () = conn.set(entry_key(&self.namespace, &fresh), &payload).await?;
            }
        }
        let index = index_key(&self.namespace, &session_key);
        let _: () = conn.sadd(&index, &fresh).await?;
        let _: () = conn.del(entry_key(&self.namespace, &internal)).await?;
        let _: () = conn.srem(&index, &internal).await?;
        self.config.external_id(&fresh)
    }
}
