//! Inbound webhook ingestion.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{dtos::WebhookAck, AppState};

/// Accept a raw webhook delivery from an external system. The external id
/// comes from the payload's `id` (or `event_id`) field; deliveries without
/// one are rejected rather than stored unkeyed.
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<WebhookAck>), AppError> {
    if source.is_empty() || source.len() > 100 {
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid source")));
    }

    let external_id = payload
        .get("id")
        .or_else(|| payload.get("event_id"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Webhook payload must carry an 'id' or 'event_id' field"
            ))
        })?
        .to_string();

    let (event, inserted) = state
        .db
        .store_webhook_event(&source, &external_id, &payload)
        .await?;

    let status = if inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(WebhookAck {
            event_id: event.event_id,
            duplicate: !inserted,
        }),
    ))
}
