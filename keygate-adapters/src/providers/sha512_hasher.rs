use keygate_core::Hasher;
use sha2::{Digest, Sha512};

/// Hex-encoded SHA-512 over the salted string.
///
/// A single fast digest, not a memory-hard password hash — kept for
/// stored-hash compatibility with the existing credential data.
pub struct Sha512Hasher;

impl Hasher for Sha512Hasher {
    fn hash(&self, salted: &str) -> String {
        hex::encode(Sha512::digest(salted.as_bytes()))
    }
}
