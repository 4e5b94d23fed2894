//! Authorization request builder.
//!
//! Pure local computation plus one store write: no network I/O happens
//! until the user follows the returned URL in a browser.

use url::Url;

use crate::config::{OAuthConfig, defaults};
use crate::error::{AuthError, AuthResult};
use crate::lifecycle::SessionLifecycle;

/// An authorization URL ready to hand to the user, with the `state` that
/// will come back on the callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Begin a session and compose the provider authorization URL for it.
///
/// # Errors
///
/// [`AuthError::StoreUnavailable`] if the session could not be persisted
/// anywhere, or [`AuthError::Config`] if the configured endpoint does not
/// parse.
pub async fn build_auth_url(
    config: &OAuthConfig,
    lifecycle: &SessionLifecycle,
    user_hint: Option<String>,
) -> AuthResult<AuthorizationRequest> {
    let begun = lifecycle.begin(&config.redirect_uri, user_hint.clone()).await?;

    let mut url = Url::parse(&config.authorization_endpoint)
        .map_err(|e| AuthError::Config(format!("authorization_endpoint: {e}")))?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("audience", defaults::AUDIENCE)
            .append_pair("client_id", &config.client_id)
            .append_pair("scope", &config.scope_param())
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("prompt", "consent")
            .append_pair("state", &begun.state)
            .append_pair("code_challenge", &begun.code_challenge)
            .append_pair("code_challenge_method", "S256");
        if let Some(ref hint) = user_hint {
            query.append_pair("login_hint", hint);
        }
    }

    Ok(AuthorizationRequest { url, state: begun.state })
}
