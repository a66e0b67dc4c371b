use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity record persisted by the user repository.
///
/// `id` and `created_at` are immutable after registration. `password_hash`
/// is always the digest of a salt derived from `(id, created_at, name,
/// plaintext password)`, so renaming a user invalidates the stored hash
/// unless it is recomputed in the same operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub password_hash: String,
}

impl User {
    pub fn new(id: Uuid, created_at: DateTime<Utc>, name: String, password_hash: String) -> Self {
        Self {
            id,
            created_at,
            name,
            password_hash,
        }
    }
}
