//! Argon2id notebook-token hashing and verification.
//!
//! Every submitted notebook gets a random bearer token that the agency's
//! connectors present when fetching the notebook or uploading the result.
//! Only the Argon2id hash is stored; the PHC string format embeds the
//! algorithm parameters and salt so nothing else needs to be persisted.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

/// Generate a random notebook token.
///
/// The plaintext is embedded in the RED document handed to the agency; only
/// the hash (see [`hash_notebook_token`]) is stored server-side.
pub fn generate_notebook_token() -> String {
    Uuid::new_v4().to_string()
}

/// Hash a notebook token with Argon2id and a fresh random salt.
///
/// Returns the hash in PHC string form.
pub fn hash_notebook_token(token: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(token.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a presented token against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only a malformed stored hash or a parameter
/// problem surfaces as `Err`.
pub fn verify_notebook_token(
    token: &str,
    hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(token.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let token = generate_notebook_token();
        let hash = hash_notebook_token(&token).expect("hashing should succeed");

        // PHC strings start with the algorithm identifier.
        assert!(hash.starts_with("$argon2id$"), "hash should be argon2id PHC");

        let verified = verify_notebook_token(&token, &hash).expect("verify should succeed");
        assert!(verified, "matching token must verify");
    }

    #[test]
    fn test_wrong_token_fails() {
        let hash = hash_notebook_token("real-token").expect("hashing should succeed");
        let verified = verify_notebook_token("wrong-token", &hash).expect("verify should succeed");
        assert!(!verified, "non-matching token must not verify");
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let result = verify_notebook_token("any-token", "not-a-phc-string");
        assert!(result.is_err(), "malformed stored hash must surface as Err");
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = generate_notebook_token();
        let b = generate_notebook_token();
        assert_ne!(a, b);
    }
}
