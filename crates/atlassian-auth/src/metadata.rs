//! Discovery documents (RFC 9728 / RFC 8414 shapes).
//!
//! Pure functions of static configuration; any misconfiguration is caught
//! by `OAuthConfig::validate` at startup, so these cannot fail at request
//! time.

use crate::config::OAuthConfig;

/// RFC 9728 protected resource metadata for the configured provider.
#[must_use]
pub fn protected_resource_metadata(config: &OAuthConfig) -> serde_json::Value {
    serde_json::json!({
        "resource": config.redirect_uri,
        "authorization_servers": [config.authorization_endpoint],
        "bearer_methods_supported": ["header"],
        "scopes_supported": config.scopes,
    })
}

/// RFC 8414 authorization server metadata for the configured provider.
#[must_use]
pub fn authorization_server_metadata(config: &OAuthConfig) -> serde_json::Value {
    serde_json::json!({
        "authorization_endpoint": config.authorization_endpoint,
        "token_endpoint": config.token_endpoint,
        "scopes_supported": config.scopes,
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["S256"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_metadata_fields() {
        let config = OAuthConfig::for_testing("https://provider.example");
        let doc = authorization_server_metadata(&config);

        assert_eq!(doc["authorization_endpoint"], "https://provider.example/authorize");
        assert_eq!(doc["token_endpoint"], "https://provider.example/oauth/token");
        assert!(doc["code_challenge_methods_supported"].as_array().unwrap().contains(&json!("S256")));
        assert!(doc["grant_types_supported"].as_array().unwrap().contains(&json!("refresh_token")));
    }

    #[test]
    fn test_resource_metadata_lists_scopes() {
        let config = OAuthConfig::for_testing("https://provider.example");
        let doc = protected_resource_metadata(&config);

        assert!(doc["scopes_supported"].as_array().unwrap().contains(&json!("offline_access")));
        assert_eq!(doc["bearer_methods_supported"], json!(["header"]));
    }

    #[test]
    fn test_metadata_is_deterministic() {
        let config = OAuthConfig::for_testing("https://provider.example");
        assert_eq!(authorization_server_metadata(&config), authorization_server_metadata(&config));
    }
}
