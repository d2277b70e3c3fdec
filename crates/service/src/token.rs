//! Bearer token primitives shared by site auth and tenant provisioning.
//!
//! A raw token is an opaque secret handed to exactly one client surface.
//! Only its SHA-256 digest is persisted; the digest itself is the lookup key,
//! so it must be deterministic across processes (no salt).

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_LEN: usize = 40;

/// Deterministic one-way digest of a raw bearer token, lowercase hex.
pub fn digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a fresh random bearer secret. Returned exactly once to the
/// caller; never persisted in the clear.
pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = digest("secret-token");
        let b = digest("secret-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_tokens_differ() {
        assert_ne!(digest("token-one"), digest("token-two"));
    }

    #[test]
    fn generated_tokens_are_unique_and_long_enough() {
        let t1 = generate();
        let t2 = generate();
        assert_eq!(t1.len(), 40);
        assert_ne!(t1, t2);
    }
}
