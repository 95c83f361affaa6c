//! Token revocation lists with pluggable storage backends
//!
//! A list is either a blacklist (listed tokens are rejected) or a whitelist
//! (only listed tokens are accepted). Tokens are never stored verbatim; every
//! backend persists the SHA-256 hex digest of the token, with a TTL mirroring
//! the token's own expiration where the backend supports one.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

mod json_file;
mod redis_store;

pub use json_file::JsonFileRevocations;
pub use redis_store::{AsyncRedisRevocations, RedisRevocations};

/// Fallback entry lifetime when the token carries no expiration (30 days)
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("revocation backend unavailable: {0}")]
    Backend(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RevocationError>;

/// Interpretation of list membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Listed tokens are rejected
    Black,
    /// Only listed tokens are accepted
    White,
}

/// Hash a token for storage
///
/// SHA-256 hex. Backends only ever see digests, so a leaked store never
/// exposes replayable tokens.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Blocking storage for hashed revocation entries
pub trait RevocationBackend: Send + Sync {
    fn insert(&self, token_hash: &str, ttl: Option<Duration>) -> Result<()>;
    fn remove(&self, token_hash: &str) -> Result<()>;
    fn contains(&self, token_hash: &str) -> Result<bool>;
}

/// Suspension-mode storage for hashed revocation entries
#[async_trait]
pub trait AsyncRevocationBackend: Send + Sync {
    async fn insert(&self, token_hash: &str, ttl: Option<Duration>) -> Result<()>;
    async fn remove(&self, token_hash: &str) -> Result<()>;
    async fn contains(&self, token_hash: &str) -> Result<bool>;
}

/// Black/white list over a blocking backend
pub struct RevocationList {
    kind: ListKind,
    backend: Box<dyn RevocationBackend>,
}

impl RevocationList {
    pub fn new(kind: ListKind, backend: impl RevocationBackend + 'static) -> Self {
        Self {
            kind,
            backend: Box::new(backend),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Add a token to the list
    ///
    /// The stored entry lives until `expires_at`; once the token itself is
    /// expired there is nothing left to revoke. Tokens that are already past
    /// their expiration are skipped.
    pub fn add(&self, token: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        let Some(ttl) = entry_ttl(expires_at) else {
            debug!("token already expired, skipping list insert");
            return Ok(());
        };
        self.backend.insert(&hash_token(token), ttl)?;
        info!(kind = ?self.kind, "token added to revocation list");
        Ok(())
    }

    /// Remove a token from the list
    pub fn delete(&self, token: &str) -> Result<()> {
        self.backend.remove(&hash_token(token))?;
        info!(kind = ?self.kind, "token removed from revocation list");
        Ok(())
    }

    /// Whether the token is acceptable under this list's semantics
    ///
    /// Blacklist: acceptable when absent. Whitelist: acceptable when present.
    pub fn check(&self, token: &str) -> Result<bool> {
        let present = self.backend.contains(&hash_token(token))?;
        Ok(match self.kind {
            ListKind::Black => !present,
            ListKind::White => present,
        })
    }
}

/// Black/white list over a suspension-mode backend
pub struct AsyncRevocationList {
    kind: ListKind,
    backend: Box<dyn AsyncRevocationBackend>,
}

impl AsyncRevocationList {
    pub fn new(kind: ListKind, backend: impl AsyncRevocationBackend + 'static) -> Self {
        Self {
            kind,
            backend: Box::new(backend),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub async fn add(&self, token: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        let Some(ttl) = entry_ttl(expires_at) else {
            debug!("token already expired, skipping list insert");
            return Ok(());
        };
        self.backend.insert(&hash_token(token), ttl).await?;
        info!(kind = ?self.kind, "token added to revocation list");
        Ok(())
    }

    pub async fn delete(&self, token: &str) -> Result<()> {
        self.backend.remove(&hash_token(token)).await?;
        info!(kind = ?self.kind, "token removed from revocation list");
        Ok(())
    }

    pub async fn check(&self, token: &str) -> Result<bool> {
        let present = self.backend.contains(&hash_token(token)).await?;
        Ok(match self.kind {
            ListKind::Black => !present,
            ListKind::White => present,
        })
    }
}

/// `None` means the token is already expired and needs no entry;
/// `Some(None)` means no expiry was supplied and the backend default applies.
fn entry_ttl(expires_at: Option<DateTime<Utc>>) -> Option<Option<Duration>> {
    match expires_at {
        None => Some(None),
        Some(at) => {
            let remaining = (at - Utc::now()).to_std().ok()?;
            if remaining.is_zero() {
                return None;
            }
            Some(Some(remaining))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_deterministic() {
        let token = "eyJhbGciOiJIUzI1NiJ9.payload.sig";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), hash_token("other"));
        assert_eq!(hash_token(token).len(), 64);
    }

    #[test]
    fn test_entry_ttl_for_live_token() {
        let at = Utc::now() + chrono::Duration::seconds(120);
        let ttl = entry_ttl(Some(at)).expect("live token gets an entry").unwrap();
        assert!(ttl.as_secs() >= 118 && ttl.as_secs() <= 120);
    }

    #[test]
    fn test_entry_ttl_for_expired_token() {
        let at = Utc::now() - chrono::Duration::seconds(5);
        assert!(entry_ttl(Some(at)).is_none());
    }

    #[test]
    fn test_entry_ttl_without_expiry() {
        assert_eq!(entry_ttl(None), Some(None));
    }
}
