//! Shared-filesystem session backend.
//!
//! Durable tier of the chain: one JSON file per `state` under a shared
//! directory, so a callback handled by a different process instance can
//! still find the session. Writes are last-writer-wins; distinct states
//! never share a file, so the only realistic race is cleanup against a
//! concurrent write, which the lifecycle tolerates by re-checking TTL at
//! resolve time.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::SessionStore;
use crate::error::{StoreError, StoreResult};
use crate::session::AuthSession;

/// Filesystem-backed session store.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first write.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// States are base64url so they are filename-safe, but reject
    /// anything that could escape the directory.
    fn path_for(&self, state: &str) -> Option<PathBuf> {
        if state.is_empty()
            || !state.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return None;
        }
        Some(self.dir.join(format!("{state}.json")))
    }

    async fn read_session(path: &Path) -> StoreResult<AuthSession> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn put(&self, session: &AuthSession) -> StoreResult<()> {
        let Some(path) = self.path_for(&session.state) else {
            return Err(StoreError::Io(std::io::Error::other("state is not filename-safe")));
        };
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(session)?;

        // Write-then-rename so a racing reader sees either the whole
        // record or nothing, never a truncated JSON prefix.
        let tmp = self.dir.join(format!("{}.tmp", session.state));
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn get(&self, state: &str) -> StoreResult<Option<AuthSession>> {
        let Some(path) = self.path_for(state) else {
            return Ok(None);
        };
        match Self::read_session(&path).await {
            Ok(session) => Ok(Some(session)),
            Err(StoreError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // Treat an unparsable record as absent, but leave the file in
            // place: deleting here could destroy a live session written
            // by a slower peer.
            Err(StoreError::Serde(err)) => {
                tracing::warn!(state = %state, error = %err, "Skipping unparsable session record");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn delete(&self, state: &str) -> StoreResult<()> {
        let Some(path) = self.path_for(state) else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> StoreResult<Vec<AuthSession>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Self::read_session(&path).await {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "Skipping unreadable record");
                }
            }
        }
        Ok(sessions)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("dir", &self.dir).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(state: &str) -> AuthSession {
        AuthSession::new(
            state.into(),
            "verifier".into(),
            "https://app.example/cb".into(),
            Some("user@example.com".into()),
        )
    }

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("sessions"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_dir, store) = store();
        store.put(&session("state-abc_123")).await.unwrap();

        let found = store.get("state-abc_123").await.unwrap().unwrap();
        assert_eq!(found.code_verifier, "verifier");
        assert_eq!(found.user_hint.as_deref(), Some("user@example.com"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_dir, store) = store();
        assert!(store.get("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = store();
        store.put(&session("s1")).await.unwrap();
        store.delete("s1").await.unwrap();
        store.delete("s1").await.unwrap();
        assert!(store.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_traversal_keys_rejected() {
        let (_dir, store) = store();
        assert!(store.put(&session("../evil")).await.is_err());
        assert!(store.get("../evil").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_treated_as_absent() {
        let (_dir, store) = store();
        store.put(&session("good")).await.unwrap();

        let corrupt = store.dir.join("bad.json");
        tokio::fs::write(&corrupt, b"{not json").await.unwrap();

        assert!(store.get("bad").await.unwrap().is_none());
        // And the corrupt file does not break listing.
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].state, "good");
    }

    #[tokio::test]
    async fn test_unparsable_record_is_not_deleted() {
        // What looks corrupt to one reader may be a peer's in-flight
        // write; a read must never destroy the record.
        let (_dir, store) = store();
        let truncated = store.dir.join("inflight.json");
        tokio::fs::create_dir_all(&store.dir).await.unwrap();
        tokio::fs::write(&truncated, b"{\"state\":\"inflight\",\"code_ver").await.unwrap();

        assert!(store.get("inflight").await.unwrap().is_none());
        assert!(tokio::fs::try_exists(&truncated).await.unwrap());

        // Once the full record lands, the same key resolves again.
        store.put(&session("inflight")).await.unwrap();
        assert!(store.get("inflight").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let (_dir, store) = store();
        store.put(&session("s1")).await.unwrap();

        let mut entries = tokio::fs::read_dir(&store.dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().into_string().unwrap());
        }
        assert_eq!(names, vec!["s1.json".to_string()]);
    }
}
