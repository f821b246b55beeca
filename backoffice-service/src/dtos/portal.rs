use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct IssueLoginLinkRequest {
    pub contact_id: Uuid,
}

#[derive(Deserialize)]
pub struct ConsumeLoginLinkRequest {
    pub token: String,
}

/// The magic-link token itself is returned to the caller, who delivers it
/// (email delivery is an external collaborator).
#[derive(Serialize)]
pub struct LoginLinkResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct PortalSessionResponse {
    pub session_token: String,
    pub contact_id: Uuid,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub event_id: Uuid,
    pub duplicate: bool,
}
