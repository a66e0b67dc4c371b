use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A single refresh credential.
///
/// At most one live row exists per `refresh_token`; the token is consumed
/// (deleted) exactly once, in the same transaction that creates its
/// replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub refresh_token: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(refresh_token: Uuid, user_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            refresh_token,
            user_id,
            expires_at,
        }
    }
}
