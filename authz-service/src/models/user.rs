//! User model.
//!
//! `email` and `phone` are ciphertext at rest; `email_hash` is the
//! non-reversible lookup key so uniqueness checks never touch plaintext.
//! Password hashing happens upstream - the core only ever sees the hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use validator::Validate;

/// User entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub email_hash: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Deterministic lookup hash over the plaintext email.
    pub fn email_lookup_hash(email: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(email.as_bytes());
        hex_encode(&hasher.finalize())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Input for member registration. Plaintext email/phone, pre-hashed password.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password_hash: String,
    #[validate(length(max = 50))]
    pub phone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_hash_is_deterministic() {
        let a = User::email_lookup_hash("user@example.com");
        let b = User::email_lookup_hash("user@example.com");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn lookup_hash_differs_per_email() {
        assert_ne!(
            User::email_lookup_hash("a@example.com"),
            User::email_lookup_hash("b@example.com")
        );
    }
}
