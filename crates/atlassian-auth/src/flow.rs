//! The inbound façade consumed by the tool-invocation layer.
//!
//! One `AuthFlow` is constructed at process startup and passed by handle
//! to every caller; there are no globals. "Begin" and "complete" may land
//! on different process instances, which the store chain bridges through
//! its durable tier.

use std::sync::Arc;

use crate::authorize;
use crate::config::OAuthConfig;
use crate::error::AuthResult;
use crate::lifecycle::SessionLifecycle;
use crate::session::TokenRecord;
use crate::store::{ChainStore, SessionStore};
use crate::token::{AccessibleResource, TokenClient};

/// Result of a begun authentication: the URL to show the user and the
/// state that will return on the callback.
#[derive(Debug, Clone)]
pub struct BeginAuth {
    pub auth_url: url::Url,
    pub state: String,
}

/// OAuth session and token-exchange engine, wired together.
pub struct AuthFlow {
    config: OAuthConfig,
    lifecycle: Arc<SessionLifecycle>,
    tokens: TokenClient,
}

impl AuthFlow {
    /// Construct the flow over the default store chain (in-process map
    /// in front of a shared filesystem directory).
    ///
    /// # Errors
    ///
    /// Returns error on invalid configuration or HTTP client
    /// initialization failure.
    pub fn new(config: OAuthConfig, session_dir: std::path::PathBuf) -> anyhow::Result<Self> {
        Self::with_store(config, Arc::new(ChainStore::with_file_tier(session_dir)))
    }

    /// Construct the flow over a caller-supplied store.
    ///
    /// # Errors
    ///
    /// Returns error on invalid configuration or HTTP client
    /// initialization failure.
    pub fn with_store(config: OAuthConfig, store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        config.validate()?;
        let lifecycle = Arc::new(SessionLifecycle::new(store, config.session_ttl));
        let tokens = TokenClient::new(&config, Arc::clone(&lifecycle))?;
        Ok(Self { config, lifecycle, tokens })
    }

    /// Begin authentication: create and persist a session, return the
    /// provider authorization URL.
    ///
    /// The redirect URI is the one fixed in [`OAuthConfig`] at startup;
    /// it is stored in the session and reused verbatim at token-exchange
    /// time.
    ///
    /// # Errors
    ///
    /// [`crate::AuthError::StoreUnavailable`] if the session could not be
    /// persisted anywhere.
    pub async fn begin_auth(&self, user_hint: Option<String>) -> AuthResult<BeginAuth> {
        let request = authorize::build_auth_url(&self.config, &self.lifecycle, user_hint).await?;
        Ok(BeginAuth { auth_url: request.url, state: request.state })
    }

    /// Complete authentication: exchange the callback's code for tokens.
    /// The session is consumed whether or not the exchange succeeds.
    ///
    /// # Errors
    ///
    /// See [`crate::token::TokenClient::exchange_code`].
    pub async fn complete_auth(&self, code: &str, state: &str) -> AuthResult<TokenRecord> {
        self.tokens.exchange_code(code, state).await
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// See [`crate::token::TokenClient::refresh`].
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenRecord> {
        self.tokens.refresh(refresh_token).await
    }

    /// Probe whether an access token is currently accepted upstream.
    pub async fn validate_token(&self, access_token: &str, probe_url: &str) -> bool {
        self.tokens.validate_token(access_token, probe_url).await
    }

    /// List the cloud sites an access token can reach.
    ///
    /// # Errors
    ///
    /// See [`crate::token::TokenClient::accessible_resources`].
    pub async fn accessible_resources(
        &self,
        access_token: &str,
    ) -> AuthResult<Vec<AccessibleResource>> {
        self.tokens.accessible_resources(access_token).await
    }

    /// Operator escape hatch: delete every session in every backend.
    /// Returns (and logs) the count removed.
    pub async fn clear_all_sessions(&self) -> usize {
        self.lifecycle.clear_all().await
    }

    /// Handle to the lifecycle manager, e.g. for spawning the background
    /// sweeper at startup.
    #[must_use]
    pub fn lifecycle(&self) -> &Arc<SessionLifecycle> {
        &self.lifecycle
    }

    /// The static configuration this flow was built with.
    #[must_use]
    pub const fn config(&self) -> &OAuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for AuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthFlow").field("config", &self.config).finish()
    }
}
