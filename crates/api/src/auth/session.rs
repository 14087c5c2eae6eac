//! Opaque web-session token generation and hashing.
//!
//! Session tokens are opaque random strings delivered to the browser in an
//! `HttpOnly` cookie; only their SHA-256 hash is stored server-side so a
//! database leak does not compromise active sessions.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a fresh session token.
///
/// Returns `(plaintext, sha256_hex_hash)`: the plaintext goes to the
/// browser in the session cookie, the hash into the session row.
pub fn generate_session_token() -> (String, String) {
    let plaintext = Uuid::new_v4().to_string();
    let hash = hash_session_token(&plaintext);
    (plaintext, hash)
}

/// Compute the SHA-256 hex digest of a session token.
///
/// Lookups hash the incoming cookie value and compare digests; plaintext
/// tokens never touch the database.
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_hash_matches() {
        let (plaintext, hash) = generate_session_token();

        // Re-hashing the same plaintext must produce the same digest.
        let rehashed = hash_session_token(&plaintext);
        assert_eq!(hash, rehashed, "hash of the same token must be stable");

        // Sanity: the hash should be a 64-char hex string (SHA-256).
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_distinct_tokens_hash_differently() {
        let (_, hash_a) = generate_session_token();
        let (_, hash_b) = generate_session_token();
        assert_ne!(hash_a, hash_b);
    }
}
