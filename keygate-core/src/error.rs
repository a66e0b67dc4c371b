use thiserror::Error;

use crate::ports::{providers::TokenSignError, store::StoreError};

/// Failure taxonomy for every operation.
///
/// `InvariantViolation` means the request itself was invalid per business
/// rules; the message is safe to show the caller verbatim. Everything else
/// is an infrastructure fault and must only reach the caller as an opaque,
/// correlation-stamped failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    TokenSigning(#[from] TokenSignError),
}

impl AuthError {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
