//! Availability rule and override handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateAvailabilityOverrideRequest, CreateAvailabilityRuleRequest, ListOverridesQuery},
    models::{
        AvailabilityOverride, AvailabilityRule, CreateAvailabilityOverride,
        CreateAvailabilityRule,
    },
    AppState,
};

pub async fn create_rule(
    State(state): State<AppState>,
    Json(payload): Json<CreateAvailabilityRuleRequest>,
) -> Result<(StatusCode, Json<AvailabilityRule>), AppError> {
    payload.validate()?;
    if payload.start_time >= payload.end_time {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "start_time must be before end_time"
        )));
    }

    let rule = state
        .db
        .create_availability_rule(&CreateAvailabilityRule {
            day_of_week: payload.day_of_week,
            start_time: payload.start_time,
            end_time: payload.end_time,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn list_rules(
    State(state): State<AppState>,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    Ok(Json(state.db.list_availability_rules().await?))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_availability_rule(rule_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Availability rule not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_override(
    State(state): State<AppState>,
    Json(payload): Json<CreateAvailabilityOverrideRequest>,
) -> Result<(StatusCode, Json<AvailabilityOverride>), AppError> {
    match (payload.start_time, payload.end_time) {
        (Some(start), Some(end)) if start >= end => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "start_time must be before end_time"
            )));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "start_time and end_time must be given together"
            )));
        }
        _ => {}
    }

    let row = state
        .db
        .create_availability_override(&CreateAvailabilityOverride {
            date: payload.date,
            is_available: payload.is_available,
            start_time: payload.start_time,
            end_time: payload.end_time,
            reason: payload.reason,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_overrides(
    State(state): State<AppState>,
    Query(query): Query<ListOverridesQuery>,
) -> Result<Json<Vec<AvailabilityOverride>>, AppError> {
    Ok(Json(
        state
            .db
            .list_availability_overrides(query.from, query.to)
            .await?,
    ))
}

pub async fn delete_override(
    State(state): State<AppState>,
    Path(override_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_availability_override(override_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Availability override not found"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
