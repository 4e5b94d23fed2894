//! Session lifecycle: begin, resolve, consume, sweep.

use std::sync::Arc;
use std::time::Duration;

use crate::config::defaults;
use crate::error::{AuthError, AuthResult};
use crate::pkce;
use crate::session::AuthSession;
use crate::store::SessionStore;

/// Public half of a begun session, everything the authorization URL
/// needs. The verifier stays in the store.
#[derive(Debug, Clone)]
pub struct BegunSession {
    pub state: String,
    pub code_challenge: String,
}

/// Orchestrates store reads and writes, enforces TTL expiry, and runs the
/// periodic sweep. Constructed once at startup and shared by handle; every
/// caller gets the same instance instead of reaching for a global.
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionLifecycle {
    /// Create a lifecycle manager over a store with the given TTL.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Generate state + PKCE pair, persist the session, and return the
    /// public half needed for the authorization URL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`] if no backend accepted the
    /// write; the caller must not hand out an authorization URL for a
    /// session that can never be found again.
    pub async fn begin(
        &self,
        redirect_uri: &str,
        user_hint: Option<String>,
    ) -> AuthResult<BegunSession> {
        let state = pkce::new_state();
        let code_verifier = pkce::new_code_verifier();
        let code_challenge = pkce::challenge_for(&code_verifier);

        let session =
            AuthSession::new(state.clone(), code_verifier, redirect_uri.to_string(), user_hint);

        match self.store.put(&session).await {
            Ok(()) => {}
            Err(err) => {
                tracing::error!(error = %err, "Failed to persist auth session");
                return Err(AuthError::StoreUnavailable);
            }
        }

        tracing::info!(state = %state, "Began auth session");
        Ok(BegunSession { state, code_challenge })
    }

    /// Look up a session by state, enforcing TTL.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidState`] if absent from every backend;
    /// [`AuthError::Expired`] if past TTL (the record is opportunistically
    /// deleted). A session physically present but expired is treated as
    /// nonexistent by every reader.
    pub async fn resolve(&self, state: &str) -> AuthResult<AuthSession> {
        let Some(session) = self.store.get(state).await? else {
            return Err(AuthError::InvalidState);
        };

        if session.is_expired(self.ttl) {
            self.consume(state).await;
            return Err(AuthError::Expired);
        }

        Ok(session)
    }

    /// Delete a session. Idempotent: an absent key is not an error.
    pub async fn consume(&self, state: &str) {
        if let Err(err) = self.store.delete(state).await {
            tracing::warn!(state = %state, error = %err, "Session delete failed");
        }
    }

    /// Delete every session past TTL. Returns the number removed.
    pub async fn sweep(&self) -> usize {
        let sessions = match self.store.list().await {
            Ok(sessions) => sessions,
            Err(err) => {
                tracing::warn!(error = %err, "Sweep could not list sessions");
                return 0;
            }
        };

        let mut removed = 0usize;
        for session in sessions {
            if session.is_expired(self.ttl) {
                self.consume(&session.state).await;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(count = removed, "Swept expired auth sessions");
        }
        removed
    }

    /// Delete every session in every backend, expired or not. Operator
    /// escape hatch; logs the count.
    pub async fn clear_all(&self) -> usize {
        let sessions = match self.store.list().await {
            Ok(sessions) => sessions,
            Err(err) => {
                tracing::warn!(error = %err, "Clear-all could not list sessions");
                return 0;
            }
        };

        let count = sessions.len();
        for session in &sessions {
            self.consume(&session.state).await;
        }
        tracing::info!(count, "Cleared all auth sessions");
        count
    }

    /// Spawn the background sweep task, one `sweep` per interval,
    /// independent of request handling.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let lifecycle = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(defaults::SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                lifecycle.sweep().await;
            }
        })
    }

    /// The configured session TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle").field("ttl", &self.ttl).finish()
    }
}
