//! PKCE (Proof Key for Code Exchange) primitives.
//!
//! Implements S256 code challenge derivation per RFC 7636, plus CSPRNG
//! generation of the `state` correlator and `code_verifier` secret.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Bytes of CSPRNG output behind a state or verifier. 32 bytes encodes to
/// 43 base64url characters, the RFC 7636 minimum verifier length.
const RANDOM_BYTES: usize = 32;

fn random_urlsafe() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a fresh `state` correlator: 32 bytes of CSPRNG output,
/// base64url without padding.
#[must_use]
pub fn new_state() -> String {
    random_urlsafe()
}

/// Generate a fresh PKCE `code_verifier` (RFC 7636 §4.1: 43-128 chars
/// from the unreserved set).
#[must_use]
pub fn new_code_verifier() -> String {
    random_urlsafe()
}

/// Derive the S256 code challenge for a verifier.
///
/// Computes `BASE64URL(SHA256(code_verifier))`, no padding. Deterministic
/// and pure.
#[must_use]
pub fn challenge_for(code_verifier: &str) -> String {
    let hash = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
