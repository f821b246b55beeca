//! Contract template, contract lifecycle, and signature audit operations.

use super::Database;
use crate::models::{
    AuditActor, Contract, ContractStatus, ContractTemplate, CreateContract,
    CreateContractTemplate, SignatureAuditLog,
};
use crate::services::metrics::{CONTRACT_EVENTS_TOTAL, DB_QUERY_DURATION};
use crate::services::{render, tokens};
use chrono::Utc;
use service_core::error::AppError;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

const TEMPLATE_COLUMNS: &str = "template_id, name, content, created_utc, updated_utc";

const CONTRACT_COLUMNS: &str = "contract_id, template_id, contact_id, title, merge_data, \
    content, status, signing_token, sent_at, viewed_at, signed_at, expires_at, signer_name, \
    signer_email, signature_hash, content_hash, agreed_to_terms, created_utc";

const AUDIT_COLUMNS: &str =
    "audit_id, contract_id, event, actor_email, ip_address, user_agent, detail, created_utc";

impl Database {
    /// Create a contract template.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_contract_template(
        &self,
        input: &CreateContractTemplate,
    ) -> Result<ContractTemplate, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_contract_template"])
            .start_timer();

        let template = sqlx::query_as::<_, ContractTemplate>(&format!(
            r#"
            INSERT INTO contract_templates (template_id, name, content)
            VALUES ($1, $2, $3)
            RETURNING {TEMPLATE_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.content)
        .fetch_one(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create template: {}", e)))?;

        timer.observe_duration();

        info!(template_id = %template.template_id, "Contract template created");

        Ok(template)
    }

    #[instrument(skip(self), fields(template_id = %template_id))]
    pub async fn get_contract_template(
        &self,
        template_id: Uuid,
    ) -> Result<Option<ContractTemplate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_contract_template"])
            .start_timer();

        let template = sqlx::query_as::<_, ContractTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM contract_templates WHERE template_id = $1"
        ))
        .bind(template_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get template: {}", e)))?;

        timer.observe_duration();

        Ok(template)
    }

    #[instrument(skip(self))]
    pub async fn list_contract_templates(&self) -> Result<Vec<ContractTemplate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_contract_templates"])
            .start_timer();

        let templates = sqlx::query_as::<_, ContractTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM contract_templates ORDER BY name"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list templates: {}", e)))?;

        timer.observe_duration();

        Ok(templates)
    }

    /// Update a template's name or content.
    #[instrument(skip(self, name, content), fields(template_id = %template_id))]
    pub async fn update_contract_template(
        &self,
        template_id: Uuid,
        name: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<ContractTemplate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_contract_template"])
            .start_timer();

        let template = sqlx::query_as::<_, ContractTemplate>(&format!(
            r#"
            UPDATE contract_templates
            SET name = COALESCE($2, name),
                content = COALESCE($3, content),
                updated_utc = NOW()
            WHERE template_id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "#,
        ))
        .bind(template_id)
        .bind(name)
        .bind(content)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update template: {}", e)))?;

        timer.observe_duration();

        Ok(template)
    }

    /// Create a draft contract from a template.
    #[instrument(skip(self, input), fields(template_id = %input.template_id, contact_id = %input.contact_id))]
    pub async fn create_contract(
        &self,
        input: &CreateContract,
        actor: &AuditActor,
    ) -> Result<Contract, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_contract"])
            .start_timer();

        self.get_contract_template(input.template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract template not found")))?;

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            INSERT INTO contracts (contract_id, template_id, contact_id, title, merge_data, status, signing_token, expires_at)
            VALUES ($1, $2, $3, $4, $5, 'draft', $6, $7)
            RETURNING {CONTRACT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(input.template_id)
        .bind(input.contact_id)
        .bind(&input.title)
        .bind(&input.merge_data)
        .bind(tokens::generate_token())
        .bind(input.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create contract: {}", e)))?;

        append_audit(&mut tx, contract.contract_id, "created", actor, serde_json::json!({})).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit contract: {}", e))
        })?;

        timer.observe_duration();
        CONTRACT_EVENTS_TOTAL.with_label_values(&["created"]).inc();

        info!(contract_id = %contract.contract_id, "Contract created");

        Ok(contract)
    }

    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_contract"])
            .start_timer();

        let contract = sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE contract_id = $1"
        ))
        .bind(contract_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get contract: {}", e)))?;

        timer.observe_duration();

        Ok(contract)
    }

    #[instrument(skip(self))]
    pub async fn list_contracts(
        &self,
        status: Option<ContractStatus>,
        contact_id: Option<Uuid>,
    ) -> Result<Vec<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_contracts"])
            .start_timer();

        let contracts = sqlx::query_as::<_, Contract>(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR contact_id = $2)
            ORDER BY created_utc DESC
            "#,
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(contact_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list contracts: {}", e)))?;

        timer.observe_duration();

        Ok(contracts)
    }

    /// Send a draft contract: render the template with the merge data,
    /// freeze the rendered content, and stamp sent_at.
    #[instrument(skip(self, actor), fields(contract_id = %contract_id))]
    pub async fn send_contract(
        &self,
        contract_id: Uuid,
        actor: &AuditActor,
    ) -> Result<Contract, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["send_contract"])
            .start_timer();

        let contract = self
            .get_contract(contract_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;
        let current = ContractStatus::from_string(&contract.status);
        if !current.can_transition_to(ContractStatus::Sent) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot send a contract in status '{}'",
                current.as_str()
            )));
        }

        let template = self
            .get_contract_template(contract.template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract template not found")))?;
        let content = render::render_template(&template.content, &contract.merge_data);

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'sent', content = $2, sent_at = NOW()
            WHERE contract_id = $1 AND status = 'draft'
            RETURNING {CONTRACT_COLUMNS}
            "#,
        ))
        .bind(contract_id)
        .bind(&content)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to send contract: {}", e)))?
        .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Contract changed concurrently")))?;

        append_audit(&mut tx, contract_id, "sent", actor, serde_json::json!({})).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit send: {}", e))
        })?;

        timer.observe_duration();
        CONTRACT_EVENTS_TOTAL.with_label_values(&["sent"]).inc();

        info!(contract_id = %contract.contract_id, "Contract sent");

        Ok(contract)
    }

    /// Void a contract from any non-terminal state.
    #[instrument(skip(self, actor), fields(contract_id = %contract_id))]
    pub async fn void_contract(
        &self,
        contract_id: Uuid,
        actor: &AuditActor,
        reason: Option<&str>,
    ) -> Result<Contract, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["void_contract"])
            .start_timer();

        let contract = self
            .get_contract(contract_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;
        let current = ContractStatus::from_string(&contract.status);
        if !current.can_transition_to(ContractStatus::Void) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot void a contract in status '{}'",
                current.as_str()
            )));
        }

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'void'
            WHERE contract_id = $1 AND status = $2
            RETURNING {CONTRACT_COLUMNS}
            "#,
        ))
        .bind(contract_id)
        .bind(current.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to void contract: {}", e)))?
        .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Contract changed concurrently")))?;

        append_audit(
            &mut tx,
            contract_id,
            "voided",
            actor,
            serde_json::json!({ "reason": reason }),
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit void: {}", e))
        })?;

        timer.observe_duration();
        CONTRACT_EVENTS_TOTAL.with_label_values(&["voided"]).inc();

        info!(contract_id = %contract.contract_id, "Contract voided");

        Ok(contract)
    }

    /// Public view through the signing token. The first view of a sent
    /// contract stamps viewed_at; a contract past its expiry flips to
    /// expired on access.
    #[instrument(skip(self, token, actor))]
    pub async fn view_contract_by_token(
        &self,
        token: &str,
        actor: &AuditActor,
    ) -> Result<Contract, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["view_contract_by_token"])
            .start_timer();

        let contract = self.get_contract_by_token(token).await?;
        let contract = self.expire_if_due(contract, actor).await?;

        let status = ContractStatus::from_string(&contract.status);
        match status {
            ContractStatus::Draft => {
                return Err(AppError::NotFound(anyhow::anyhow!("Contract not found")))
            }
            ContractStatus::Void => {
                return Err(AppError::Gone(anyhow::anyhow!("Contract has been voided")))
            }
            ContractStatus::Sent => {
                let mut tx = self.pool().begin().await.map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
                })?;

                let stamped = sqlx::query_as::<_, Contract>(&format!(
                    r#"
                    UPDATE contracts
                    SET status = 'viewed', viewed_at = NOW()
                    WHERE contract_id = $1 AND status = 'sent'
                    RETURNING {CONTRACT_COLUMNS}
                    "#,
                ))
                .bind(contract.contract_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to stamp view: {}", e))
                })?;

                if stamped.is_some() {
                    append_audit(
                        &mut tx,
                        contract.contract_id,
                        "viewed",
                        actor,
                        serde_json::json!({}),
                    )
                    .await?;
                }

                tx.commit().await.map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to commit view: {}", e))
                })?;

                timer.observe_duration();
                CONTRACT_EVENTS_TOTAL.with_label_values(&["viewed"]).inc();
                return Ok(stamped.unwrap_or(contract));
            }
            _ => {}
        }

        timer.observe_duration();

        Ok(contract)
    }

    /// Sign a contract through its token. Requires explicit agreement to
    /// terms; records content and signature hashes. Content is immutable
    /// afterwards.
    #[instrument(skip(self, token, actor, signature), fields(signer_email = %signer_email))]
    pub async fn sign_contract_by_token(
        &self,
        token: &str,
        signer_name: &str,
        signer_email: &str,
        signature: &str,
        agreed_to_terms: bool,
        actor: &AuditActor,
    ) -> Result<Contract, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["sign_contract_by_token"])
            .start_timer();

        if !agreed_to_terms {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Signing requires agreeing to the terms"
            )));
        }

        let contract = self.get_contract_by_token(token).await?;
        let contract = self.expire_if_due(contract, actor).await?;

        let current = ContractStatus::from_string(&contract.status);
        if current == ContractStatus::Expired {
            return Err(AppError::Gone(anyhow::anyhow!("Contract has expired")));
        }
        if !current.can_transition_to(ContractStatus::Signed) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot sign a contract in status '{}'",
                current.as_str()
            )));
        }

        let content = contract.content.clone().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Sent contract has no rendered content"))
        })?;
        let content_hash = render::content_hash(&content);
        let signature_hash = render::content_hash(signature);

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'signed',
                signed_at = NOW(),
                signer_name = $2,
                signer_email = $3,
                signature_hash = $4,
                content_hash = $5,
                agreed_to_terms = TRUE
            WHERE contract_id = $1 AND status = $6
            RETURNING {CONTRACT_COLUMNS}
            "#,
        ))
        .bind(contract.contract_id)
        .bind(signer_name)
        .bind(signer_email)
        .bind(&signature_hash)
        .bind(&content_hash)
        .bind(current.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sign contract: {}", e)))?
        .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Contract changed concurrently")))?;

        append_audit(
            &mut tx,
            contract.contract_id,
            "signed",
            actor,
            serde_json::json!({
                "signer_name": signer_name,
                "content_hash": content_hash,
            }),
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit signature: {}", e))
        })?;

        timer.observe_duration();
        CONTRACT_EVENTS_TOTAL.with_label_values(&["signed"]).inc();

        info!(contract_id = %contract.contract_id, "Contract signed");

        Ok(contract)
    }

    /// Decline a contract through its token, recording the reason.
    #[instrument(skip(self, token, actor))]
    pub async fn decline_contract_by_token(
        &self,
        token: &str,
        reason: Option<&str>,
        actor: &AuditActor,
    ) -> Result<Contract, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["decline_contract_by_token"])
            .start_timer();

        let contract = self.get_contract_by_token(token).await?;
        let contract = self.expire_if_due(contract, actor).await?;

        let current = ContractStatus::from_string(&contract.status);
        if current == ContractStatus::Expired {
            return Err(AppError::Gone(anyhow::anyhow!("Contract has expired")));
        }
        if !current.can_transition_to(ContractStatus::Declined) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot decline a contract in status '{}'",
                current.as_str()
            )));
        }

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'declined'
            WHERE contract_id = $1 AND status = $2
            RETURNING {CONTRACT_COLUMNS}
            "#,
        ))
        .bind(contract.contract_id)
        .bind(current.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to decline: {}", e)))?
        .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Contract changed concurrently")))?;

        append_audit(
            &mut tx,
            contract.contract_id,
            "declined",
            actor,
            serde_json::json!({ "reason": reason }),
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit decline: {}", e))
        })?;

        timer.observe_duration();
        CONTRACT_EVENTS_TOTAL.with_label_values(&["declined"]).inc();

        info!(contract_id = %contract.contract_id, "Contract declined");

        Ok(contract)
    }

    /// Audit trail for a contract, oldest first.
    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn list_signature_audit(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<SignatureAuditLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_signature_audit"])
            .start_timer();

        let entries = sqlx::query_as::<_, SignatureAuditLog>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM signature_audit_log WHERE contract_id = $1 ORDER BY created_utc"
        ))
        .bind(contract_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list audit log: {}", e)))?;

        timer.observe_duration();

        Ok(entries)
    }

    async fn get_contract_by_token(&self, token: &str) -> Result<Contract, AppError> {
        sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE signing_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get contract: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))
    }

    /// Flip a sent/viewed contract past its expiry to expired, with audit.
    async fn expire_if_due(
        &self,
        contract: Contract,
        actor: &AuditActor,
    ) -> Result<Contract, AppError> {
        let status = ContractStatus::from_string(&contract.status);
        let due = contract
            .expires_at
            .map(|at| at < Utc::now())
            .unwrap_or(false);
        if !due || !status.can_transition_to(ContractStatus::Expired) {
            return Ok(contract);
        }

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let expired = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'expired'
            WHERE contract_id = $1 AND status = $2
            RETURNING {CONTRACT_COLUMNS}
            "#,
        ))
        .bind(contract.contract_id)
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to expire contract: {}", e)))?;

        if expired.is_some() {
            append_audit(
                &mut tx,
                contract.contract_id,
                "expired",
                actor,
                serde_json::json!({}),
            )
            .await?;
            CONTRACT_EVENTS_TOTAL.with_label_values(&["expired"]).inc();
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit expiry: {}", e))
        })?;

        Ok(expired.unwrap_or(contract))
    }
}

/// Append an audit row inside the caller's transaction. Rows are append-only
/// by construction: no update or delete path exists.
async fn append_audit(
    tx: &mut Transaction<'_, Postgres>,
    contract_id: Uuid,
    event: &str,
    actor: &AuditActor,
    detail: serde_json::Value,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO signature_audit_log (audit_id, contract_id, event, actor_email, ip_address, user_agent, detail)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(contract_id)
    .bind(event)
    .bind(&actor.email)
    .bind(&actor.ip_address)
    .bind(&actor.user_agent)
    .bind(detail)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to append audit log: {}", e)))?;

    Ok(())
}
