//! Error types for the OAuth session and token-exchange engine.
//!
//! Uses `thiserror` for structured error handling with automatic `From`
//! implementations. External callers receive a stable machine-readable
//! `kind` plus a human-readable remedy; the remedy for every recoverable
//! failure is "restart authentication", never "retry the same code".

/// Errors from the session store layer.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Filesystem error in the durable backend
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted record could not be (de)serialized
    #[error("Store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Every backend in the chain failed the write
    #[error("All session store backends failed")]
    Unavailable,
}

/// Errors from the OAuth flow.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// State absent from every backend, or already consumed. Deliberately
    /// indistinguishable from "never existed" to external callers.
    #[error("Invalid or unknown authentication state")]
    InvalidState,

    /// Session found but older than the configured TTL
    #[error("Authentication session has expired")]
    Expired,

    /// Provider returned non-2xx, or the request failed in transit
    #[error("Token exchange failed ({status}): {body}")]
    TokenExchangeFailed {
        /// Upstream HTTP status, 0 for transport-level failures
        status: u16,
        /// Upstream response body, for diagnostics only
        body: String,
    },

    /// Provider returned 2xx without an `access_token`
    #[error("Malformed token response: {0}")]
    InvalidTokenResponse(String),

    /// Every store backend failed the session write
    #[error("Session store unavailable")]
    StoreUnavailable,

    /// Static configuration rejected at startup
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Create a token exchange failure from an upstream status and body.
    #[must_use]
    pub fn exchange_failed(status: u16, body: impl Into<String>) -> Self {
        Self::TokenExchangeFailed { status, body: body.into() }
    }

    /// Create a token exchange failure for a transport-level error
    /// (connect, TLS, timeout). A timeout of unknown outcome is not
    /// retryable for a single-use authorization code.
    #[must_use]
    pub fn transport(err: &dyn std::fmt::Display) -> Self {
        Self::TokenExchangeFailed { status: 0, body: err.to_string() }
    }

    /// Stable machine-readable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidState => "invalid_state",
            Self::Expired => "expired",
            Self::TokenExchangeFailed { .. } => "token_exchange_failed",
            Self::InvalidTokenResponse(_) => "invalid_token_response",
            Self::StoreUnavailable => "store_unavailable",
            Self::Config(_) => "config",
        }
    }

    /// Human-readable instruction for the end user. Never echoes upstream
    /// bodies, codes, or verifiers.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::InvalidState | Self::Expired => {
                "Your authentication session is no longer valid. Please restart authentication."
                    .to_string()
            }
            Self::TokenExchangeFailed { .. } | Self::InvalidTokenResponse(_) => {
                "Authentication with the provider failed. Please restart authentication."
                    .to_string()
            }
            Self::StoreUnavailable => {
                "Authentication is temporarily unavailable. Please try again shortly.".to_string()
            }
            Self::Config(msg) => format!("The server is misconfigured: {msg}"),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => Self::StoreUnavailable,
            // A read-side store fault is indistinguishable from a missing
            // session; the caller's remedy is the same.
            StoreError::Io(_) | StoreError::Serde(_) => Self::InvalidState,
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for auth flow operations.
pub type AuthResult<T> = Result<T, AuthError>;
