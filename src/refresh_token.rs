//! Opaque refresh token generation.
//!
//! The raw token is handed to the client once; only its SHA-256 digest is
//! ever stored and used as the lookup key.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token (256 bits of entropy).
const TOKEN_BYTES: usize = 32;

/// Generate a new raw refresh token: 32 random bytes, base64url without padding.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lowercase hex SHA-256 digest of a raw token.
pub fn hash(raw_token: &str) -> String {
    let digest = Sha256::digest(raw_token.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let raw = generate();
        assert_eq!(hash(&raw), hash(&raw));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let digest = hash("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
        assert_ne!(hash(&a), hash(&b));
    }

    #[test]
    fn test_generated_token_is_url_safe() {
        let token = generate();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
