use chrono::{DateTime, Utc};
use keygate_core::Salter;
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

/// Deterministic per-user salt: the static process secret interleaved with
/// `(created_at, name, password, id)` in fixed order. Two users sharing a
/// password salt differently (id and created_at differ), and renaming a
/// user changes the salt — which is why a name change must re-hash with
/// the plaintext supplied in the same call.
pub struct StaticSalter {
    static_salt: Secret<String>,
}

impl StaticSalter {
    pub fn new(static_salt: Secret<String>) -> Self {
        Self { static_salt }
    }
}

impl Salter for StaticSalter {
    fn salt(&self, id: Uuid, created_at: DateTime<Utc>, name: &str, password: &str) -> String {
        let secret = self.static_salt.expose_secret();
        let created_at = created_at.to_rfc3339();
        format!("{created_at}{secret}{name}{secret}{password}{created_at}{id}{id}")
    }
}
