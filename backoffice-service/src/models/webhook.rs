//! Stored webhook deliveries, deduplicated by (source, external_id).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookEvent {
    pub event_id: Uuid,
    pub source: String,
    pub external_id: String,
    pub payload: serde_json::Value,
    pub received_utc: DateTime<Utc>,
}
