//! Pluggable session persistence.
//!
//! The store is an ordered chain of backends, fastest and least durable
//! first. `put` writes to every backend, `get` returns the first hit and
//! backfills the faster tiers, so "begin" and "complete" can run in
//! different process instances as long as one durable backend bridges
//! them.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::session::AuthSession;

/// Uniform contract every backend implements.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a session keyed by its `state`.
    async fn put(&self, session: &AuthSession) -> StoreResult<()>;

    /// Fetch a session by `state`. `Ok(None)` means not found, which is
    /// indistinguishable from "never existed", "expired and swept", or
    /// "already consumed".
    async fn get(&self, state: &str) -> StoreResult<Option<AuthSession>>;

    /// Delete a session. Deleting an absent key is not an error.
    async fn delete(&self, state: &str) -> StoreResult<()>;

    /// List all physically present sessions, for diagnostics and sweeps.
    async fn list(&self) -> StoreResult<Vec<AuthSession>>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// Ordered chain of backends with write-to-all / read-first-hit
/// semantics.
pub struct ChainStore {
    backends: Vec<Arc<dyn SessionStore>>,
}

impl ChainStore {
    /// Build a chain from ordered backends, fastest first.
    ///
    /// # Panics
    ///
    /// Panics if `backends` is empty; a store with no backends cannot
    /// hold any session.
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn SessionStore>>) -> Self {
        assert!(!backends.is_empty(), "ChainStore requires at least one backend");
        Self { backends }
    }

    /// The default chain: in-process map backed by a shared filesystem
    /// directory.
    #[must_use]
    pub fn with_file_tier(dir: std::path::PathBuf) -> Self {
        Self::new(vec![Arc::new(MemoryStore::new()), Arc::new(FileStore::new(dir))])
    }
}

#[async_trait]
impl SessionStore for ChainStore {
    /// Write to every backend. A single backend failure is logged and
    /// tolerated; the call fails only if no backend accepted the write,
    /// since handing out an authorization URL for an unfindable session
    /// would strand the user.
    async fn put(&self, session: &AuthSession) -> StoreResult<()> {
        let mut succeeded = 0usize;
        for backend in &self.backends {
            match backend.put(session).await {
                Ok(()) => succeeded += 1,
                Err(err) => {
                    tracing::warn!(backend = backend.name(), error = %err, "Session write failed");
                }
            }
        }
        if succeeded == 0 {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    /// Query backends in order; on a hit, backfill the faster tiers so
    /// subsequent lookups in this process stay cheap.
    async fn get(&self, state: &str) -> StoreResult<Option<AuthSession>> {
        for (idx, backend) in self.backends.iter().enumerate() {
            let found = match backend.get(state).await {
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!(backend = backend.name(), error = %err, "Session read failed");
                    None
                }
            };

            if let Some(session) = found {
                for earlier in &self.backends[..idx] {
                    if let Err(err) = earlier.put(&session).await {
                        tracing::debug!(backend = earlier.name(), error = %err, "Backfill failed");
                    }
                }
                return Ok(Some(session));
            }
        }
        Ok(None)
    }

    /// Delete from every backend, best-effort.
    async fn delete(&self, state: &str) -> StoreResult<()> {
        for backend in &self.backends {
            if let Err(err) = backend.delete(state).await {
                tracing::warn!(backend = backend.name(), error = %err, "Session delete failed");
            }
        }
        Ok(())
    }

    /// Merge all backends by `state`; the earliest backend's copy wins.
    async fn list(&self) -> StoreResult<Vec<AuthSession>> {
        let mut merged: Vec<AuthSession> = Vec::new();
        for backend in &self.backends {
            let sessions = match backend.list().await {
                Ok(sessions) => sessions,
                Err(err) => {
                    tracing::warn!(backend = backend.name(), error = %err, "Session list failed");
                    continue;
                }
            };
            for session in sessions {
                if !merged.iter().any(|s| s.state == session.state) {
                    merged.push(session);
                }
            }
        }
        Ok(merged)
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.backends.iter().map(|b| b.name()).collect();
        f.debug_struct("ChainStore").field("backends", &names).finish()
    }
}
