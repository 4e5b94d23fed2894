//! Atlassian OAuth session and token-exchange engine
//!
//! Authenticates end users against an Atlassian-style OAuth 2.1 provider
//! on behalf of a tool-invocation server whose "begin" and "complete"
//! steps may run in different process instances. Sessions are persisted
//! through an ordered chain of backends (in-process map in front of a
//! durable tier) so the authorization-code-with-PKCE flow can be
//! correlated across instances without shared memory.
//!
//! # Features
//!
//! - **PKCE (S256)**: CSPRNG state/verifier, RFC 7636 challenge
//! - **Multi-backend sessions**: write-to-all, read-first-hit, backfill
//! - **Single-use exchange**: a session is consumed on every outcome
//! - **Background sweep**: TTL enforcement independent of requests
//!
//! # Example
//!
//! ```no_run
//! use atlassian_auth::{AuthFlow, OAuthConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OAuthConfig::from_env()?;
//!     let flow = AuthFlow::new(config, "/var/lib/mcp/sessions".into())?;
//!     flow.lifecycle().spawn_sweeper();
//!
//!     let begun = flow.begin_auth(None).await?;
//!     println!("open {}", begun.auth_url);
//!     Ok(())
//! }
//! ```

pub mod authorize;
pub mod config;
pub mod error;
pub mod flow;
pub mod lifecycle;
pub mod metadata;
pub mod pkce;
pub mod session;
pub mod store;
pub mod token;

pub use config::OAuthConfig;
pub use error::{AuthError, StoreError};
pub use flow::{AuthFlow, BeginAuth};
pub use lifecycle::SessionLifecycle;
pub use session::{AuthSession, TokenRecord};
pub use store::{ChainStore, FileStore, MemoryStore, SessionStore};
pub use token::TokenClient;
