//! Integration tests for the OAuth flow against a stub provider.
//!
//! Covers the full lifecycle: begin → authorization URL → callback code
//! exchange → consumption, plus refresh and validation probes.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atlassian_auth::error::AuthError;
use atlassian_auth::store::MemoryStore;
use atlassian_auth::{AuthFlow, OAuthConfig};

fn build_flow(base_url: &str) -> AuthFlow {
    let config = OAuthConfig::for_testing(base_url);
    AuthFlow::with_store(config, Arc::new(MemoryStore::new())).unwrap()
}

// ─── Begin ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_begin_auth_url_shape() {
    let flow = build_flow("https://provider.example");
    let begun = flow.begin_auth(None).await.unwrap();

    assert!(begun.state.len() >= 40);
    let url = begun.auth_url.as_str();
    assert!(url.contains("code_challenge_method=S256"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains(&format!("state={}", begun.state)));
    // The configured redirect URI is the one the flow hands out.
    assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example%2Fcb"));
}

// ─── Code exchange ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_complete_auth_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok123",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let begun = flow.begin_auth(None).await.unwrap();

    let record = flow.complete_auth("abc", &begun.state).await.unwrap();
    assert_eq!(record.access_token, "tok123");
    assert_eq!(record.token_type, "Bearer");
    assert!(record.refresh_token.is_none());

    let remaining = record.expires_at.signed_duration_since(Utc::now()).num_seconds();
    assert!((3590..=3600).contains(&remaining));

    // The session was consumed by the successful exchange.
    assert!(matches!(
        flow.lifecycle().resolve(&begun.state).await,
        Err(AuthError::InvalidState)
    ));
}

#[tokio::test]
async fn test_unknown_state_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let err = flow.complete_auth("x", "does-not-exist").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidState));
}

#[tokio::test]
async fn test_second_exchange_fails_with_invalid_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok123",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let begun = flow.begin_auth(None).await.unwrap();

    flow.complete_auth("abc", &begun.state).await.unwrap();

    // Consumption is idempotent even though the exchange itself is not:
    // the second call must fail before any network traffic.
    let err = flow.complete_auth("abc", &begun.state).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidState));
}

#[tokio::test]
async fn test_provider_400_consumes_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let begun = flow.begin_auth(None).await.unwrap();

    let err = flow.complete_auth("abc", &begun.state).await.unwrap_err();
    match err {
        AuthError::TokenExchangeFailed { status, ref body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected TokenExchangeFailed, got {other:?}"),
    }

    // A failed exchange must not leave a replayable session behind.
    assert!(matches!(
        flow.lifecycle().resolve(&begun.state).await,
        Err(AuthError::InvalidState)
    ));
}

#[tokio::test]
async fn test_missing_access_token_is_protocol_violation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let begun = flow.begin_auth(None).await.unwrap();

    let err = flow.complete_auth("abc", &begun.state).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidTokenResponse(_)));
    assert!(matches!(
        flow.lifecycle().resolve(&begun.state).await,
        Err(AuthError::InvalidState)
    ));
}

#[tokio::test]
async fn test_huge_expires_in_is_protocol_violation() {
    // A provider claiming a u64::MAX lifetime must yield an error, not
    // panic in the expiry arithmetic.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok123",
            "token_type": "Bearer",
            "expires_in": 18_446_744_073_709_551_615u64
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let begun = flow.begin_auth(None).await.unwrap();

    let err = flow.complete_auth("abc", &begun.state).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidTokenResponse(_)));
    assert!(matches!(
        flow.lifecycle().resolve(&begun.state).await,
        Err(AuthError::InvalidState)
    ));
}

#[tokio::test]
async fn test_login_hint_round_trips_to_url() {
    let flow = build_flow("https://provider.example");
    let begun = flow.begin_auth(Some("user@example.com".into())).await.unwrap();
    assert!(begun.auth_url.as_str().contains("login_hint=user%40example.com"));
}

// ─── Refresh ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok456",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "rt-2",
            "scope": "read:jira-work offline_access"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let record = flow.refresh("rt-1").await.unwrap();

    assert_eq!(record.access_token, "tok456");
    assert_eq!(record.refresh_token.as_deref(), Some("rt-2"));
    assert_eq!(record.scope, "read:jira-work offline_access");
}

#[tokio::test]
async fn test_refresh_rejected_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let err = flow.refresh("stale").await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExchangeFailed { status: 400, .. }));
}

// ─── Validation & resources ──────────────────────────────────────────────────

#[tokio::test]
async fn test_validate_token_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myself"))
        .and(header("Authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let probe = format!("{}/myself", server.uri());

    assert!(flow.validate_token("tok123", &probe).await);
}

#[tokio::test]
async fn test_validate_token_non_2xx_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myself"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let probe = format!("{}/myself", server.uri());

    assert!(!flow.validate_token("tok123", &probe).await);
}

#[tokio::test]
async fn test_accessible_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/token/accessible-resources"))
        .and(header("Authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "cloud-1",
                "name": "example",
                "url": "https://example.atlassian.net",
                "scopes": ["read:jira-work"]
            }
        ])))
        .mount(&server)
        .await;

    let flow = build_flow(&server.uri());
    let resources = flow.accessible_resources("tok123").await.unwrap();

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].id, "cloud-1");
    assert_eq!(resources[0].url, "https://example.atlassian.net");
}
