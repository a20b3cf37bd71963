//! Password-reset tokens.
//!
//! The raw token goes out by email only; the database keeps its SHA-256
//! hash and an expiry.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// How long a reset token stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 20;

const RESET_TOKEN_BYTES: usize = 20;

/// A freshly generated reset token.
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Hex token for the reset URL.
    pub raw: String,
    /// Hex SHA-256 of `raw`, for storage.
    pub hash: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Generate a token valid from `now`.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let raw = hex::encode(bytes);
        let hash = hash_reset_token(&raw);
        Self {
            raw,
            hash,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }
}

/// Hex SHA-256 of a raw reset token.
#[must_use]
pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let now = Utc::now();
        let token = ResetToken::generate(now);
        assert_eq!(token.raw.len(), RESET_TOKEN_BYTES * 2);
        assert!(token.raw.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token.hash, hash_reset_token(&token.raw));
        assert_ne!(token.hash, token.raw);
    }

    #[test]
    fn test_expires_in_twenty_minutes() {
        let now = Utc::now();
        let token = ResetToken::generate(now);
        assert_eq!(token.expires_at - now, Duration::minutes(20));
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            hash_reset_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_tokens_differ() {
        let now = Utc::now();
        assert_ne!(ResetToken::generate(now).raw, ResetToken::generate(now).raw);
    }
}
