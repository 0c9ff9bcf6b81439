//! Shared cryptographic primitives used across the gateway.
//!
//! Three concerns live here because every component that touches a secret
//! needs them: constant-time comparison of digests (so enrollment checks and
//! session token lookups cannot be timed), SHA-256 digesting, and redacted
//! string wrappers so secrets never end up in a `{:?}` log line by accident.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

pub use secrecy::{ExposeSecret, SecretString};

/// Errors from token decoding.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The token was not valid URL-safe base64.
    #[error("invalid token encoding")]
    InvalidEncoding,
}

/// Minimum entropy (in bytes) for a session token, per the data model's
/// "≥192 bits" invariant.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random, URL-safe token with at least
/// `SESSION_TOKEN_BYTES` bytes of entropy (256 bits, comfortably over the
/// 192-bit floor).
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 digest of `value`.
#[must_use]
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two strings for equality in constant time.
///
/// Used anywhere a forged guess must not be distinguishable from a near-miss
/// by timing: enrollment secret digests, session token lookups.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    // Constant-time comparison requires equal-length inputs; comparing
    // lengths first is safe because length alone is not attacker-useful
    // (it's public information for any fixed-width digest or token).
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Verify a shared secret against a stored SHA-256 hex digest, in constant time.
#[must_use]
pub fn verify_digest(secret: &str, expected_digest_hex: &str) -> bool {
    constant_time_eq(&sha256_hex(secret), expected_digest_hex)
}
