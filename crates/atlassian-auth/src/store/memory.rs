//! In-process session backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SessionStore;
use crate::error::StoreResult;
use crate::session::AuthSession;

/// Fastest tier of the chain: a mutex-guarded map. Lost on process
/// restart or instance change, so it is purely an optimization over the
/// durable tier.
#[derive(Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, AuthSession>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(&self, session: &AuthSession) -> StoreResult<()> {
        self.sessions.write().await.insert(session.state.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, state: &str) -> StoreResult<Option<AuthSession>> {
        Ok(self.sessions.read().await.get(state).cloned())
    }

    async fn delete(&self, state: &str) -> StoreResult<()> {
        self.sessions.write().await.remove(state);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<AuthSession>> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish()
    }
}
