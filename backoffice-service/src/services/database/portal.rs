//! Client-portal login-token and session repository operations.

use super::Database;
use crate::models::{PortalLoginToken, PortalSession};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::tokens;
use chrono::{Duration, Utc};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

const LOGIN_TOKEN_COLUMNS: &str =
    "token_id, contact_id, token, expires_at, consumed_at, created_utc";

const SESSION_COLUMNS: &str = "session_id, contact_id, token, expires_at, created_utc";

impl Database {
    /// Issue a magic-link login token for a contact.
    #[instrument(skip(self), fields(contact_id = %contact_id))]
    pub async fn issue_login_token(
        &self,
        contact_id: Uuid,
        ttl_minutes: i64,
    ) -> Result<PortalLoginToken, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["issue_login_token"])
            .start_timer();

        self.get_contact(contact_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

        let token = sqlx::query_as::<_, PortalLoginToken>(&format!(
            r#"
            INSERT INTO portal_login_tokens (token_id, contact_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {LOGIN_TOKEN_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(contact_id)
        .bind(tokens::generate_token())
        .bind(Utc::now() + Duration::minutes(ttl_minutes))
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to issue token: {}", e)))?;

        timer.observe_duration();

        info!(token_id = %token.token_id, "Login token issued");

        Ok(token)
    }

    /// Consume a magic-link token exactly once and issue a portal session.
    /// A second use answers 410, as does an expired token.
    #[instrument(skip(self, token))]
    pub async fn consume_login_token(
        &self,
        token: &str,
        session_ttl_minutes: i64,
    ) -> Result<PortalSession, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["consume_login_token"])
            .start_timer();

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let login = sqlx::query_as::<_, PortalLoginToken>(&format!(
            "SELECT {LOGIN_TOKEN_COLUMNS} FROM portal_login_tokens WHERE token = $1 FOR UPDATE"
        ))
        .bind(token)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get token: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Login link not found")))?;

        if login.consumed_at.is_some() {
            return Err(AppError::Gone(anyhow::anyhow!(
                "Login link has already been used"
            )));
        }
        if login.expires_at < Utc::now() {
            return Err(AppError::Gone(anyhow::anyhow!("Login link has expired")));
        }

        sqlx::query("UPDATE portal_login_tokens SET consumed_at = NOW() WHERE token_id = $1")
            .bind(login.token_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to consume token: {}", e))
            })?;

        let session = sqlx::query_as::<_, PortalSession>(&format!(
            r#"
            INSERT INTO portal_sessions (session_id, contact_id, token, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {SESSION_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(login.contact_id)
        .bind(tokens::generate_token())
        .bind(Utc::now() + Duration::minutes(session_ttl_minutes))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create session: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit login: {}", e))
        })?;

        timer.observe_duration();

        info!(contact_id = %session.contact_id, "Portal session created");

        Ok(session)
    }
}
