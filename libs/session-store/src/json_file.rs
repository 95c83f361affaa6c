//! JSON-file session backend
//!
//! A single JSON document mapping internal ids to session records. The file
//! format has no native TTL, so expired records are filtered on read and
//! purged whenever the document is rewritten. The blocking logic is written
//! once; the suspension-mode impl runs it on `spawn_blocking`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    AsyncSessionBackend, Result, SessionBackend, SessionConfig, SessionData, SessionError,
};

#[derive(Clone, Serialize, Deserialize)]
struct Record {
    session_key: String,
    data: SessionData,
    /// Unix expiry seconds, `None` = never expires
    expires_at: Option<i64>,
}

impl Record {
    fn live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

type Records = HashMap<String, Record>;

#[derive(Clone)]
pub struct JsonFileSessions {
    path: PathBuf,
    config: Arc<SessionConfig>,
    lock: Arc<Mutex<()>>,
}

impl JsonFileSessions {
    /// Open a file-backed store; the file is created on first write
    pub fn new(path: impl Into<PathBuf>, config: SessionConfig) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(config),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> Result<Records> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Records::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, records: &Records) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_vec(records)?)?;
        Ok(())
    }

    fn purge_expired(records: &mut Records) {
        let now = Utc::now().timestamp();
        records.retain(|_, record| record.live(now));
    }

    fn create_sync(&self, session_key: &str, data: &SessionData) -> Result<String> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records = self.load()?;
        Self::purge_expired(&mut records);

        let id = self.config.new_internal_id();
        records.insert(
            id.clone(),
            Record {
                session_key: session_key.to_string(),
                data: data.clone(),
                expires_at: self.config.expires_at(),
            },
        );
        self.store(&records)?;
        debug!(path = %self.path.display(), sessions = records.len(), "session created");
        self.config.external_id(&id)
    }

    fn get_sync(&self, id: &str) -> Result<SessionData> {
        let internal = self.config.internal_id(id)?;
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let records = self.load()?;
        let now = Utc::now().timestamp();
        records
            .get(&internal)
            .filter(|record| record.live(now))
            .map(|record| record.data.clone())
            .ok_or(SessionError::NotFound)
    }

    fn update_sync(&self, id: &str, data: &SessionData) -> Result<()> {
        let internal = self.config.internal_id(id)?;
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records = self.load()?;
        Self::purge_expired(&mut records);

        let record = records.get_mut(&internal).ok_or(SessionError::NotFound)?;
        record.data = data.clone();
        record.expires_at = self.config.expires_at();
        self.store(&records)
    }

    fn delete_sync(&self, id: &str) -> Result<()> {
        let internal = self.config.internal_id(id)?;
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records = self.load()?;
        Self::purge_expired(&mut records);
        records.remove(&internal);
        self.store(&records)
    }

    fn clear_sync(&self, session_key: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records = self.load()?;
        Self::purge_expired(&mut records);
        records.retain(|_, record| record.session_key != session_key);
        self.store(&records)
    }

    fn rotate_sync(&self, id: &str) -> Result<String> {
        let internal = self.config.internal_id(id)?;
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records = self.load()?;
        Self::purge_expired(&mut records);

        let record = records.remove(&internal).ok_or(SessionError::NotFound)?;
        let fresh = self.config.new_internal_id();
        records.insert(
            fresh.clone(),
            Record {
                expires_at: self.config.expires_at(),
                ..record
            },
        );
        self.store(&records)?;
        debug!(path = %self.path.display(), "session rotated");
        self.config.external_id(&fresh)
    }
}

fn poisoned() -> SessionError {
    SessionError::Backend("session file lock poisoned".into())
}

impl SessionBackend for JsonFileSessions {
    fn create(&self, session_key: &str, data: &SessionData) -> Result<String> {
        self.create_sync(session_key, data)
    }

    fn get(&self, id: &str) -> Result<SessionData> {
        self.get_sync(id)
    }

    fn update(&self, id: &str, data: &SessionData) -> Result<()> {
        self.update_sync(id, data)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.delete_sync(id)
    }

    fn clear(&self, session_key: &str) -> Result<()> {
        self.clear_sync(session_key)
    }

    fn rotate(&self, id: &str) -> Result<String> {
        self.rotate_sync(id)
    }
}

#[async_trait]
impl AsyncSessionBackend for JsonFileSessions {
    async fn create(&self, session_key: &str, data: &SessionData) -> Result<String> {
        let this = self.clone();
        let key = session_key.to_string();
        let data = data.clone();
        tokio::task::spawn_blocking(move || this.create_sync(&key, &data))
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?
    }

    async fn get(&self, id: &str) -> Result<SessionData> {
        let this = self.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || this.get_sync(&id))
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?
    }

    async fn update(&self, id: &str, data: &SessionData) -> Result<()> {
        let this = self.clone();
        let id = id.to_string();
        let data = data.clone();
        tokio::task::spawn_blocking(move || this.update_sync(&id, &data))
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let this = self.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || this.delete_sync(&id))
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?
    }

    async fn clear(&self, session_key: &str) -> Result<()> {
        let this = self.clone();
        let key = session_key.to_string();
        tokio::task::spawn_blocking(move || this.clear_sync(&key))
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?
    }

    async fn rotate(&self, id: &str) -> Result<String> {
        let this = self.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || this.rotate_sync(&id))
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{JsonFileSessions, SessionBackend, SessionConfig, SessionData, SessionError};
    use crate::SessionCipher;

    fn sample_data() -> SessionData {
        let mut data = SessionData::new();
        data.insert("role".to_string(), json!("admin"));
        data
    }

    fn temp_store(config: SessionConfig) -> (tempfile::TempDir, JsonFileSessions) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessions::new(dir.path().join("sessions.json"), config);
        (dir, store)
    }

    #[test]
    fn test_lifecycle() {
        let (_dir, store) = temp_store(SessionConfig::default());

        let id = store.create("user-1", &sample_data()).unwrap();
        assert_eq!(store.get(&id).unwrap(), sample_data());

        let mut updated = sample_data();
        updated.insert("theme".to_string(), json!("dark"));
        store.update(&id, &updated).unwrap();
        assert_eq!(store.get(&id).unwrap(), updated);

        store.delete(&id).unwrap();
        assert!(matches!(store.get(&id), Err(SessionError::NotFound)));
    }

    #[test]
    fn test_update_requires_existence() {
        let (_dir, store) = temp_store(SessionConfig::default());
        assert!(matches!(
            store.update("no-such-id", &sample_data()),
            Err(SessionError::NotFound)
        ));
    }

    #[test]
    fn test_rotate_invalidates_old_id() {
        let (_dir, store) = temp_store(SessionConfig::default());

        let old = store.create("user-1", &sample_data()).unwrap();
        let fresh = store.rotate(&old).unwrap();
        assert_ne!(old, fresh);
        assert_eq!(store.get(&fresh).unwrap(), sample_data());
        assert!(matches!(store.get(&old), Err(SessionError::NotFound)));
    }

    #[test]
    fn test_clear_removes_only_matching_key() {
        let (_dir, store) = temp_store(SessionConfig::default());

        let a1 = store.create("alice", &sample_data()).unwrap();
        let a2 = store.create("alice", &sample_data()).unwrap();
        let b = store.create("bob", &sample_data()).unwrap();

        store.clear("alice").unwrap();
        assert!(matches!(store.get(&a1), Err(SessionError::NotFound)));
        assert!(matches!(store.get(&a2), Err(SessionError::NotFound)));
        assert!(store.get(&b).is_ok());
    }

    #[test]
    fn test_expired_sessions_are_invisible() {
        let (_dir, store) = temp_store(SessionConfig {
            ttl: Some(Duration::from_secs(0)),
            ..SessionConfig::default()
        });

        let id = store.create("user-1", &sample_data()).unwrap();
        assert!(matches!(store.get(&id), Err(SessionError::NotFound)));
    }

    #[test]
    fn test_sealed_ids_round_trip() {
        let (_dir, store) = temp_store(SessionConfig {
            cipher: Some(SessionCipher::new(&[0x42; 32]).unwrap()),
            ..SessionConfig::default()
        });

        let id = store.create("user-1", &sample_data()).unwrap();
        assert!(id.starts_with("enc."));
        assert_eq!(store.get(&id).unwrap(), sample_data());

        // a forged id is indistinguishable from a missing session
        assert!(matches!(
            store.get("enc.AAAAAAAAAAAAAAAAAAAAAAAAAAAA"),
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            store.get("plain-looking-id"),
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_async_backend_over_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessions::new(dir.path().join("sessions.json"), SessionConfig::default());

        let id = crate::AsyncSessionBackend::create(&store, "user-1", &sample_data())
            .await
            .unwrap();
        assert_eq!(
            crate::AsyncSessionBackend::get(&store, &id).await.unwrap(),
            sample_data()
        );
        let fresh = crate::AsyncSessionBackend::rotate(&store, &id).await.unwrap();
        crate::AsyncSessionBackend::delete(&store, &fresh).await.unwrap();
        assert!(matches!(
            crate::AsyncSessionBackend::get(&store, &fresh).await,
            Err(SessionError::NotFound)
        ));
    }
}
