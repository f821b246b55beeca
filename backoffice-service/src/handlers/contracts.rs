//! Contract template and contract lifecycle handlers.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        CreateContractRequest, CreateContractTemplateRequest, ListContractsQuery,
        UpdateContractTemplateRequest, VoidContractRequest,
    },
    handlers::actor_from_headers,
    models::{
        Contract, ContractStatus, ContractTemplate, CreateContract, CreateContractTemplate,
        SignatureAuditLog,
    },
    AppState,
};

pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractTemplateRequest>,
) -> Result<(StatusCode, Json<ContractTemplate>), AppError> {
    payload.validate()?;

    let template = state
        .db
        .create_contract_template(&CreateContractTemplate {
            name: payload.name,
            content: payload.content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
) -> Result<Json<ContractTemplate>, AppError> {
    state
        .db
        .get_contract_template(template_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract template not found")))
}

pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContractTemplate>>, AppError> {
    Ok(Json(state.db.list_contract_templates().await?))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Json(payload): Json<UpdateContractTemplateRequest>,
) -> Result<Json<ContractTemplate>, AppError> {
    payload.validate()?;

    state
        .db
        .update_contract_template(
            template_id,
            payload.name.as_deref(),
            payload.content.as_deref(),
        )
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract template not found")))
}

pub async fn create_contract(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<Contract>), AppError> {
    payload.validate()?;

    state
        .db
        .get_contact(payload.contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    let actor = actor_from_headers(&headers, None);
    let contract = state
        .db
        .create_contract(
            &CreateContract {
                template_id: payload.template_id,
                contact_id: payload.contact_id,
                title: payload.title,
                merge_data: payload.merge_data,
                expires_at: payload.expires_at,
            },
            &actor,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(contract)))
}

pub async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<Contract>, AppError> {
    state
        .db
        .get_contract(contract_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))
}

pub async fn list_contracts(
    State(state): State<AppState>,
    Query(query): Query<ListContractsQuery>,
) -> Result<Json<Vec<Contract>>, AppError> {
    let status = query.status.as_deref().map(ContractStatus::from_string);
    Ok(Json(state.db.list_contracts(status, query.contact_id).await?))
}

pub async fn send_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Contract>, AppError> {
    let actor = actor_from_headers(&headers, None);
    Ok(Json(state.db.send_contract(contract_id, &actor).await?))
}

pub async fn void_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<VoidContractRequest>,
) -> Result<Json<Contract>, AppError> {
    let actor = actor_from_headers(&headers, None);
    Ok(Json(
        state
            .db
            .void_contract(contract_id, &actor, payload.reason.as_deref())
            .await?,
    ))
}

pub async fn audit_log(
    State(state): State<AppState>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<Vec<SignatureAuditLog>>, AppError> {
    state
        .db
        .get_contract(contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;

    Ok(Json(state.db.list_signature_audit(contract_id).await?))
}
