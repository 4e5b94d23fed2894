//! Token exchange against the upstream provider.
//!
//! Two HTTP clients on purpose: the authorization-code exchange never
//! retries (the code is single-use, so a retry after a timeout of unknown
//! outcome is unsafe), while refresh and validation go through the
//! retry middleware with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;

use crate::config::OAuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::lifecycle::SessionLifecycle;
use crate::session::{AuthSession, TokenRecord, TokenResponse};

/// One cloud site a token can access, from the Atlassian
/// `accessible-resources` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessibleResource {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Client for the provider token endpoint.
pub struct TokenClient {
    /// Non-retrying client for the code exchange.
    exchange_client: reqwest::Client,

    /// Retrying client for refresh and validation probes.
    retry_client: ClientWithMiddleware,

    lifecycle: Arc<SessionLifecycle>,
    token_endpoint: String,
    accessible_resources_endpoint: String,
    client_id: String,
    client_secret: Option<String>,
}

impl TokenClient {
    /// Create a token client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &OAuthConfig, lifecycle: Arc<SessionLifecycle>) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let exchange_client = reqwest::Client::builder()
            .default_headers(headers.clone())
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(5))
            .build_with_max_retries(3);

        let retry_client = ClientBuilder::new(
            reqwest::Client::builder()
                .default_headers(headers)
                .timeout(config.request_timeout)
                .connect_timeout(config.connect_timeout)
                .build()?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self {
            exchange_client,
            retry_client,
            lifecycle,
            token_endpoint: config.token_endpoint.clone(),
            accessible_resources_endpoint: config.accessible_resources_endpoint.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The session is consumed on every outcome once it has been
    /// resolved: a code must not be exchangeable twice, and a failed
    /// exchange must not leave a replayable session behind.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidState`] / [`AuthError::Expired`] before any
    /// network call; [`AuthError::TokenExchangeFailed`] on non-2xx or
    /// transport failure; [`AuthError::InvalidTokenResponse`] on a 2xx
    /// without `access_token`.
    pub async fn exchange_code(&self, code: &str, state: &str) -> AuthResult<TokenRecord> {
        let session = self.lifecycle.resolve(state).await?;

        let result = self.post_code_exchange(code, &session).await;
        self.lifecycle.consume(state).await;

        match &result {
            Ok(_) => tracing::info!(state = %state, "Token exchange succeeded"),
            Err(err) => tracing::warn!(state = %state, kind = err.kind(), "Token exchange failed"),
        }
        result
    }

    async fn post_code_exchange(&self, code: &str, session: &AuthSession) -> AuthResult<TokenRecord> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            // Must be the exact value used at authorization time; this is
            // what prevents authorization-code injection.
            ("redirect_uri", session.redirect_uri.as_str()),
            ("code_verifier", session.code_verifier.as_str()),
        ];
        if let Some(ref secret) = self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .exchange_client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        Self::parse_token_response(response).await
    }

    /// Exchange a refresh token for a new token pair. Stateless with
    /// respect to sessions, and safe to retry.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::exchange_code`], minus the state errors.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenRecord> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        if let Some(ref secret) = self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .retry_client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        let record = Self::parse_token_response(response).await?;
        tracing::info!("Refreshed access token");
        Ok(record)
    }

    /// Lightweight liveness probe for an access token: authenticated GET
    /// against a known-cheap endpoint, any non-2xx is invalid. Used
    /// opportunistically; `expires_at` remains the source of truth.
    pub async fn validate_token(&self, access_token: &str, probe_url: &str) -> bool {
        let response = self
            .retry_client
            .get(probe_url)
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await;

        match response {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::debug!(error = %err, "Token validation probe failed");
                false
            }
        }
    }

    /// List the cloud sites this token can access. Callers need this to
    /// obtain the cloud id for subsequent REST calls.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenExchangeFailed`] on non-2xx or transport
    /// failure; [`AuthError::InvalidTokenResponse`] if the body does not
    /// parse.
    pub async fn accessible_resources(
        &self,
        access_token: &str,
    ) -> AuthResult<Vec<AccessibleResource>> {
        let response = self
            .retry_client
            .get(&self.accessible_resources_endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| AuthError::transport(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AuthError::transport(&e))?;
        if !status.is_success() {
            return Err(AuthError::exchange_failed(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))
    }

    async fn parse_token_response(response: reqwest::Response) -> AuthResult<TokenRecord> {
        let status = response.status();
        let body = response.text().await.map_err(|e| AuthError::transport(&e))?;

        if !status.is_success() {
            return Err(AuthError::exchange_failed(status.as_u16(), body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;
        parsed.into_record().map_err(AuthError::InvalidTokenResponse)
    }
}

impl std::fmt::Debug for TokenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClient")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .finish()
    }
}
