//! Session and token records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending authorization flow, created by the "begin auth" step and
/// consumed by the callback step. Immutable after creation: only ever
/// deleted, never mutated.
///
/// Records are serialized as JSON into the durable backend, so fields are
/// additive-only; no schema versioning is needed for records this
/// short-lived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Opaque CSPRNG correlator; primary lookup key.
    pub state: String,

    /// PKCE secret. Never transmitted except to the token endpoint.
    pub code_verifier: String,

    /// Redirect URI used at authorization time; must match byte-for-byte
    /// at token-exchange time.
    pub redirect_uri: String,

    /// Creation timestamp for TTL enforcement.
    pub created_at: DateTime<Utc>,

    /// Optional login hint (e.g. email). Display only, never used for
    /// authorization decisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_hint: Option<String>,
}

impl AuthSession {
    /// Create a session stamped with the current time.
    #[must_use]
    pub fn new(
        state: String,
        code_verifier: String,
        redirect_uri: String,
        user_hint: Option<String>,
    ) -> Self {
        Self { state, code_verifier, redirect_uri, created_at: Utc::now(), user_hint }
    }

    /// Check whether the session is past the given TTL.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        age.to_std().is_ok_and(|age| age > ttl)
    }
}

/// Tokens returned by a successful exchange. Owned by the caller; this
/// crate never persists issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer access token, verbatim from the provider.
    pub access_token: String,

    /// Token type, normally `Bearer`.
    pub token_type: String,

    /// Granted scope, verbatim from the provider.
    pub scope: String,

    /// Refresh token; present when `offline_access` was granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiry, derived as `now + expires_in`.
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Check whether the access token is past its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Raw token endpoint response body (RFC 6749 §5.1).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Normalize into a [`TokenRecord`].
    ///
    /// # Errors
    ///
    /// Returns the protocol violation description if `access_token` is
    /// absent from a 2xx response, or if `expires_in` cannot be turned
    /// into a finite expiry timestamp.
    pub fn into_record(self) -> Result<TokenRecord, String> {
        let Some(access_token) = self.access_token.filter(|t| !t.is_empty()) else {
            return Err("response is missing access_token".to_string());
        };

        let expires_in = self.expires_in.unwrap_or(3600);
        let delta = i64::try_from(expires_in)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .ok_or_else(|| format!("expires_in {expires_in} is out of range"))?;
        let expires_at = Utc::now()
            .checked_add_signed(delta)
            .ok_or_else(|| format!("expires_in {expires_in} overflows the expiry timestamp"))?;

        Ok(TokenRecord {
            access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: self.scope.unwrap_or_default(),
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}
