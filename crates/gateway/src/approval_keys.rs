//! HMAC-signed approval links (§11): a decider clicking a link embedded in
//! a chat/email notification must not need a session token, but the link
//! itself must not be forgeable or replayable against a different
//! approval. Grounded on `acteon-gateway::gateway::ApprovalKeySet` and its
//! `compute_approval_sig`/`verify_approval_sig` pair, trimmed to
//! Breakwater's flatter `(tenant, approval id, expiry)` shape (no
//! namespace concept here).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use breakwater_core::{ApprovalId, TenantId};

type HmacSha256 = Hmac<Sha256>;

/// One HMAC signing key, identified by a `kid` so keys can be rotated
/// without invalidating links signed under the previous key until it is
/// fully retired.
#[derive(Debug, Clone)]
pub struct ApprovalKey {
    pub kid: String,
    pub secret: Vec<u8>,
}

/// An ordered set of approval-link signing keys. The first entry is
/// "current" -- used for signing new links. Verification tries the named
/// `kid` (or, absent one, every key) so links signed under a since-rotated
/// key still verify until an operator removes it from the set.
#[derive(Debug, Clone)]
pub struct ApprovalKeySet {
    keys: Vec<ApprovalKey>,
}

impl ApprovalKeySet {
    /// # Panics
    /// Panics if `keys` is empty -- a gateway with no approval key cannot
    /// sign or verify any link.
    #[must_use]
    pub fn new(keys: Vec<ApprovalKey>) -> Self {
        assert!(!keys.is_empty(), "ApprovalKeySet requires at least one key");
        Self { keys }
    }

    /// A single-key set under the legacy `k0` kid, for the common case of
    /// one `approval_secret` rather than a rotating list.
    #[must_use]
    pub fn from_single(secret: Vec<u8>) -> Self {
        Self::new(vec![ApprovalKey {
            kid: "k0".to_string(),
            secret,
        }])
    }

    #[must_use]
    pub fn current(&self) -> &ApprovalKey {
        &self.keys[0]
    }

    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&ApprovalKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    #[must_use]
    pub fn all(&self) -> &[ApprovalKey] {
        &self.keys
    }
}

/// Length-prefix every field so that, e.g., a tenant of `"ab"` plus an
/// approval id of `"cd"` can never be confused with a tenant of `"a"` plus
/// an id of `"bcd"` -- naive concatenation is vulnerable to exactly this
/// canonicalization attack.
fn signing_message(tenant_id: &TenantId, approval_id: ApprovalId, expires_at: &str) -> Vec<u8> {
    let tenant = tenant_id.as_str();
    let id = approval_id.to_string();
    format!(
        "{}:{}\n{}:{}\n{}",
        tenant.len(),
        tenant,
        id.len(),
        id,
        expires_at
    )
    .into_bytes()
}

fn hmac_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Sign an approval link under the current key. Returns `(signature_hex,
/// kid)`; both are embedded in the link's query string so a verifier knows
/// which key to check without trying every one.
#[must_use]
pub fn compute_approval_sig(
    keys: &ApprovalKeySet,
    tenant_id: &TenantId,
    approval_id: ApprovalId,
    expires_at: &str,
) -> (String, String) {
    let key = keys.current();
    let message = signing_message(tenant_id, approval_id, expires_at);
    (hmac_hex(&key.secret, &message), key.kid.clone())
}

/// Verify a signature against either the named `kid`'s key (if present and
/// known) or, absent a match, every configured key -- so a link signed
/// before a key rotation still verifies as long as the old key has not yet
/// been removed from the set.
#[must_use]
pub fn verify_approval_sig(
    keys: &ApprovalKeySet,
    tenant_id: &TenantId,
    approval_id: ApprovalId,
    expires_at: &str,
    kid: Option<&str>,
    signature_hex: &str,
) -> bool {
    let message = signing_message(tenant_id, approval_id, expires_at);
    let candidates: Vec<&ApprovalKey> = match kid.and_then(|k| keys.get(k)) {
        Some(key) => vec![key],
        None => keys.all().iter().collect(),
    };
    candidates
        .into_iter()
        .any(|key| constant_time_hex_eq(&hmac_hex(&key.secret, &message), signature_hex))
}

/// XOR-fold comparison over the hex strings, constant-time for equal
/// lengths. Unequal lengths are rejected immediately -- the length of a
/// hex-encoded HMAC is fixed and public, so this leaks nothing a forger
/// doesn't already know.
fn constant_time_hex_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}
