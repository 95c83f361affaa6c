//! Server-side session storage
//!
//! A session is a JSON object stored under a random internal id, grouped by a
//! caller-chosen session key (typically a user id). Backends implement the
//! same contract twice, once blocking and once suspending. An optional
//! [`SessionCipher`] seals the internal id before it leaves the process, and
//! every failure to unseal is reported as a missing session.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod cipher;
mod json_file;
mod redis_store;

pub use cipher::SessionCipher;
pub use json_file::JsonFileSessions;
pub use redis_store::{AsyncRedisSessions, RedisSessions};

/// JSON payload attached to a session
pub type SessionData = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing, expired, or an id that fails to unseal. One variant for all
    /// three, so callers cannot tell them apart.
    #[error("session not found")]
    NotFound,

    #[error("session backend error: {0}")]
    Backend(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid session configuration: {0}")]
    Configuration(String),

    #[error("session cipher failure: {0}")]
    Crypto(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Id generation, expiry and id-sealing policy shared by all backends
#[derive(Clone)]
pub struct SessionConfig {
    /// Sessions outlive this duration only until the next read or purge
    pub ttl: Option<Duration>,
    pub id_factory: fn() -> String,
    pub cipher: Option<SessionCipher>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            id_factory: token_codec::random_hex_id,
            cipher: None,
        }
    }
}

impl SessionConfig {
    pub(crate) fn new_internal_id(&self) -> String {
        (self.id_factory)()
    }

    /// Id handed to the caller, sealed when a cipher is configured
    pub(crate) fn external_id(&self, internal: &str) -> Result<String> {
        match &self.cipher {
            Some(cipher) => cipher.seal(internal),
            None => Ok(internal.to_string()),
        }
    }

    /// Recover the backend id from a caller-supplied one
    pub(crate) fn internal_id(&self, external: &str) -> Result<String> {
        match &self.cipher {
            Some(cipher) => cipher.open(external).ok_or(SessionError::NotFound),
            None => Ok(external.to_string()),
        }
    }

    pub(crate) fn expires_at(&self) -> Option<i64> {
        self.ttl
            .map(|ttl| chrono::Utc::now().timestamp() + ttl.as_secs() as i64)
    }
}

/// Blocking session backend
///
/// `create` returns the id the caller must present afterwards. `update`
/// requires the session to exist and refreshes its TTL. `rotate` carries the
/// data to a fresh id and invalidates the old one. `clear` removes every
/// session under a session key.
pub trait SessionBackend: Send + Sync {
    fn create(&self, session_key: &str, data: &SessionData) -> Result<String>;
    fn get(&self, id: &str) -> Result<SessionData>;
    fn update(&self, id: &str, data: &SessionData) -> Result<()>;
    fn delete(&self, id: &str) -> Result<()>;
    fn clear(&self, session_key: &str) -> Result<()>;
    fn rotate(&self, id: &str) -> Result<String>;
}

/// Suspension-mode twin of [`SessionBackend`]
#[async_trait]
pub trait AsyncSessionBackend: Send + Sync {
    async fn create(&self, session_key: &str, data: &SessionData) -> Result<String>;
    async fn get(&self, id: &str) -> Result<SessionData>;
    async fn update(&self, id: &str, data: &SessionData) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn clear(&self, session_key: &str) -> Result<()>;
    async fn rotate(&self, id: &str) -> Result<String>;
}
