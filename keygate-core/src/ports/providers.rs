use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::auth_claims::AuthClaims;

/// Source of the current instant. Abstracted so operations are
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh opaque identifiers (user ids, refresh tokens).
pub trait IdProvider: Send + Sync {
    fn random(&self) -> Uuid;
}

/// One-way digest over a salted string.
pub trait Hasher: Send + Sync {
    fn hash(&self, salted: &str) -> String;
}

/// Deterministic per-user salt. The output is a function of the static
/// process-wide secret and `(id, created_at, name, password)`, in that
/// fixed order: a password reused across users salts differently, and a
/// renamed user salts differently, which is why a name change must re-hash.
pub trait Salter: Send + Sync {
    fn salt(&self, id: Uuid, created_at: DateTime<Utc>, name: &str, password: &str) -> String;
}

#[derive(Debug, Error)]
#[error("token signing failed: {message}")]
pub struct TokenSignError {
    message: String,
}

impl TokenSignError {
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self {
            message: cause.to_string(),
        }
    }
}

/// Creates and verifies signed, time-bound access tokens.
///
/// `try_parse` treats invalid input as a normal outcome: malformed tokens,
/// bad signatures and foreign signature algorithms all yield `None`. Expiry
/// of the embedded claims is the caller's responsibility.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, claims: &AuthClaims) -> Result<String, TokenSignError>;
    fn try_parse(&self, token: &str) -> Option<AuthClaims>;
}
