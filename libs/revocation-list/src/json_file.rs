//! JSON-file revocation backend
//!
//! A single JSON document mapping token hashes to their expiry timestamps.
//! The file format has no native TTL, so expired entries are filtered on
//! read and purged whenever the document is rewritten.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::{AsyncRevocationBackend, Result, RevocationBackend, RevocationError};

/// Hash -> unix expiry seconds (`None` = never expires)
type Entries = HashMap<String, Option<i64>>;

#[derive(Clone)]
pub struct JsonFileRevocations {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileRevocations {
    /// Open a file-backed list; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> Result<Entries> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, entries: &Entries) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_vec(entries)?)?;
        Ok(())
    }

    fn purge_expired(entries: &mut Entries) {
        let now = Utc::now().timestamp();
        entries.retain(|_, expires| expires.map_or(true, |at| at > now));
    }

    fn insert_sync(&self, token_hash: &str, ttl: Option<Duration>) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = self.load()?;
        Self::purge_expired(&mut entries);
        let expires_at = ttl.map(|d| Utc::now().timestamp() + d.as_secs() as i64);
        entries.insert(token_hash.to_string(), expires_at);
        self.store(&entries)?;
        debug!(path = %self.path.display(), entries = entries.len(), "revocation entry written");
        Ok(())
    }

    fn remove_sync(&self, token_hash: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut entries = self.load()?;
        Self::purge_expired(&mut entries);
        entries.remove(token_hash);
        self.store(&entries)?;
        Ok(())
    }

    fn contains_sync(&self, token_hash: &str) -> Result<bool> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let entries = self.load()?;
        let now = Utc::now().timestamp();
        Ok(entries
            .get(token_hash)
            .map_or(false, |expires| expires.map_or(true, |at| at > now)))
    }
}

fn poisoned() -> RevocationError {
    RevocationError::Backend("revocation file lock poisoned".into())
}

impl RevocationBackend for JsonFileRevocations {
    fn insert(&self, token_hash: &str, ttl: Option<Duration>) -> Result<()> {
        self.insert_sync(token_hash, ttl)
    }

    fn remove(&self, token_hash: &str) -> Result<()> {
        self.remove_sync(token_hash)
    }

    fn contains(&self, token_hash: &str) -> Result<bool> {
        self.contains_sync(token_hash)
    }
}

#[async_trait]
impl AsyncRevocationBackend for JsonFileRevocations {
    async fn insert(&self, token_hash: &str, ttl: Option<Duration>) -> Result<()> {
        let this = self.clone();
        let hash = token_hash.to_string();
        tokio::task::spawn_blocking(move || this.insert_sync(&hash, ttl))
            .await
            .map_err(|e| RevocationError::Backend(e.to_string()))?
    }

    async fn remove(&self, token_hash: &str) -> Result<()> {
        let this = self.clone();
        let hash = token_hash.to_string();
        tokio::task::spawn_blocking(move || this.remove_sync(&hash))
            .await
            .map_err(|e| RevocationError::Backend(e.to_string()))?
    }

    async fn contains(&self, token_hash: &str) -> Result<bool> {
        let this = self.clone();
        let hash = token_hash.to_string();
        tokio::task::spawn_blocking(move || this.contains_sync(&hash))
            .await
            .map_err(|e| RevocationError::Backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::{Duration, JsonFileRevocations, RevocationBackend};
    use crate::{hash_token, ListKind, RevocationList};

    fn temp_list(kind: ListKind) -> (tempfile::TempDir, RevocationList) {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileRevocations::new(dir.path().join("revoked.json"));
        (dir, RevocationList::new(kind, backend))
    }

    #[test]
    fn test_blacklist_lifecycle() {
        let (_dir, list) = temp_list(ListKind::Black);
        let token = "header.payload.signature";

        assert!(list.check(token).unwrap());
        list.add(token, None).unwrap();
        assert!(!list.check(token).unwrap());
        list.delete(token).unwrap();
        assert!(list.check(token).unwrap());
    }

    #[test]
    fn test_whitelist_semantics() {
        let (_dir, list) = temp_list(ListKind::White);
        let token = "trusted.token.here";

        assert!(!list.check(token).unwrap());
        list.add(token, None).unwrap();
        assert!(list.check(token).unwrap());
    }

    #[test]
    fn test_expired_entries_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileRevocations::new(dir.path().join("revoked.json"));

        let hash = hash_token("short-lived");
        backend.insert(&hash, Some(Duration::from_secs(0))).unwrap();
        assert!(!backend.contains(&hash).unwrap());
    }

    #[test]
    fn test_purge_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileRevocations::new(dir.path().join("revoked.json"));

        backend
            .insert(&hash_token("stale"), Some(Duration::from_secs(0)))
            .unwrap();
        backend.insert(&hash_token("fresh"), None).unwrap();

        let entries = backend.load().unwrap();
        assert!(!entries.contains_key(&hash_token("stale")));
        assert!(entries.contains_key(&hash_token("fresh")));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileRevocations::new(dir.path().join("never-written.json"));
        assert!(!backend.contains(&hash_token("anything")).unwrap());
    }

    #[tokio::test]
    async fn test_async_backend_over_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileRevocations::new(dir.path().join("revoked.json"));
        let hash = hash_token("async-token");

        crate::AsyncRevocationBackend::insert(&backend, &hash, None)
            .await
            .unwrap();
        assert!(crate::AsyncRevocationBackend::contains(&backend, &hash)
            .await
            .unwrap());
        crate::AsyncRevocationBackend::remove(&backend, &hash).await.unwrap();
        assert!(!crate::AsyncRevocationBackend::contains(&backend, &hash)
            .await
            .unwrap());
    }
}
