//! Configuration for the OAuth session engine.

use std::time::Duration;

use crate::error::AuthError;

/// Provider endpoint and timing constants.
pub mod defaults {
    use std::time::Duration;

    /// Atlassian 3LO authorization endpoint.
    pub const AUTHORIZATION_ENDPOINT: &str = "https://auth.atlassian.com/authorize";

    /// Atlassian 3LO token endpoint.
    pub const TOKEN_ENDPOINT: &str = "https://auth.atlassian.com/oauth/token";

    /// Endpoint listing the cloud sites a token can access.
    pub const ACCESSIBLE_RESOURCES_ENDPOINT: &str =
        "https://api.atlassian.com/oauth/token/accessible-resources";

    /// Audience required by Atlassian 3LO authorization requests.
    pub const AUDIENCE: &str = "api.atlassian.com";

    /// Session TTL: long enough for a human to complete the browser
    /// redirect, short enough to bound replay risk.
    pub const SESSION_TTL: Duration = Duration::from_secs(600);

    /// Interval between background expiry sweeps.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

    /// Token endpoint request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Static OAuth configuration, supplied once at startup and never mutated
/// at runtime.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Provider authorization endpoint URL.
    pub authorization_endpoint: String,

    /// Provider token endpoint URL.
    pub token_endpoint: String,

    /// Endpoint listing accessible cloud resources for a bearer token.
    pub accessible_resources_endpoint: String,

    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret (confidential clients only).
    pub client_secret: Option<String>,

    /// Redirect URI registered with the provider. Must match
    /// byte-for-byte between the authorization and token requests.
    pub redirect_uri: String,

    /// Scopes requested on every authorization, space-joined into the
    /// `scope` parameter.
    pub scopes: Vec<String>,

    /// Session TTL for the begin → callback window.
    pub session_ttl: Duration,

    /// Token endpoint request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl OAuthConfig {
    /// Create a configuration for the production Atlassian endpoints.
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: Option<String>,
        redirect_uri: String,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            authorization_endpoint: defaults::AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: defaults::TOKEN_ENDPOINT.to_string(),
            accessible_resources_endpoint: defaults::ACCESSIBLE_RESOURCES_ENDPOINT.to_string(),
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            session_ttl: defaults::SESSION_TTL,
            request_timeout: defaults::REQUEST_TIMEOUT,
            connect_timeout: defaults::CONNECT_TIMEOUT,
        }
    }

    /// Create a test configuration pointed at a mock provider.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            authorization_endpoint: format!("{base_url}/authorize"),
            token_endpoint: format!("{base_url}/oauth/token"),
            accessible_resources_endpoint: format!("{base_url}/oauth/token/accessible-resources"),
            client_id: "test-client".to_string(),
            client_secret: None,
            redirect_uri: "https://app.example/cb".to_string(),
            scopes: vec!["read:jira-work".to_string(), "offline_access".to_string()],
            session_ttl: defaults::SESSION_TTL,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing.
    pub fn from_env() -> anyhow::Result<Self> {
        let client_id = std::env::var("ATLASSIAN_OAUTH_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("ATLASSIAN_OAUTH_CLIENT_ID is not set"))?;
        let client_secret = std::env::var("ATLASSIAN_OAUTH_CLIENT_SECRET").ok();
        let redirect_uri = std::env::var("ATLASSIAN_OAUTH_REDIRECT_URI")
            .map_err(|_| anyhow::anyhow!("ATLASSIAN_OAUTH_REDIRECT_URI is not set"))?;
        let scopes = std::env::var("ATLASSIAN_OAUTH_SCOPES")
            .unwrap_or_else(|_| "read:jira-work write:jira-work offline_access".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self::new(client_id, client_secret, redirect_uri, scopes))
    }

    /// Space-joined scope parameter value.
    #[must_use]
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    /// Validate the configuration. Misconfiguration fails here, at
    /// startup, not at request time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Config("client_id must not be empty".to_string()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::Config("redirect_uri must not be empty".to_string()));
        }
        if self.scopes.is_empty() {
            return Err(AuthError::Config("at least one scope is required".to_string()));
        }
        if self.session_ttl.is_zero() {
            return Err(AuthError::Config("session_ttl must be non-zero".to_string()));
        }
        for (name, value) in [
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("accessible_resources_endpoint", &self.accessible_resources_endpoint),
        ] {
            url::Url::parse(value)
                .map_err(|e| AuthError::Config(format!("{name} is not a valid URL: {e}")))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}
