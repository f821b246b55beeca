//! Client-portal tokens: single-use magic-link login tokens and the
//! sessions they exchange into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Magic-link token. Consumed exactly once; re-use answers 410.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortalLoginToken {
    pub token_id: Uuid,
    pub contact_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortalSession {
    pub session_id: Uuid,
    pub contact_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}
