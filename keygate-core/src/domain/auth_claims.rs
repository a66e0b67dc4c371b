use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried inside a signed access token. Never persisted; validity
/// is signature verification plus the embedded expiry, cross-checked
/// against live user existence where revocation matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
