//! Webhook delivery storage, deduplicated by (source, external_id).

use super::Database;
use crate::models::WebhookEvent;
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

const WEBHOOK_COLUMNS: &str = "event_id, source, external_id, payload, received_utc";

impl Database {
    /// Store a raw webhook payload. A duplicate delivery returns the
    /// original row with `false` so at-least-once senders get a clean 200.
    #[instrument(skip(self, payload), fields(source = %source, external_id = %external_id))]
    pub async fn store_webhook_event(
        &self,
        source: &str,
        external_id: &str,
        payload: &serde_json::Value,
    ) -> Result<(WebhookEvent, bool), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["store_webhook_event"])
            .start_timer();

        let inserted = sqlx::query_as::<_, WebhookEvent>(&format!(
            r#"
            INSERT INTO webhook_events (event_id, source, external_id, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source, external_id) DO NOTHING
            RETURNING {WEBHOOK_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(source)
        .bind(external_id)
        .bind(payload)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to store webhook: {}", e)))?;

        timer.observe_duration();

        if let Some(event) = inserted {
            info!(event_id = %event.event_id, "Webhook stored");
            return Ok((event, true));
        }

        let existing = sqlx::query_as::<_, WebhookEvent>(&format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhook_events WHERE source = $1 AND external_id = $2"
        ))
        .bind(source)
        .bind(external_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get webhook: {}", e)))?;

        info!(event_id = %existing.event_id, "Webhook deduplicated");

        Ok((existing, false))
    }
}
