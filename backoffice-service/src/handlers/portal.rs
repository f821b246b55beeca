//! Public portal handlers. Everything here authenticates by capability
//! token in the path or body, never by an admin credential.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{
        ConsumeLoginLinkRequest, DeclineContractRequest, InvoiceDetail, IssueLoginLinkRequest,
        LoginLinkResponse, PortalSessionResponse, SignContractRequest,
    },
    handlers::actor_from_headers,
    models::{Booking, BookingStatus, Contract},
    AppState,
};

pub async fn issue_login_link(
    State(state): State<AppState>,
    Json(payload): Json<IssueLoginLinkRequest>,
) -> Result<(StatusCode, Json<LoginLinkResponse>), AppError> {
    let token = state
        .db
        .issue_login_token(payload.contact_id, state.config.portal_login_ttl_minutes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoginLinkResponse {
            token: token.token,
            expires_at: token.expires_at,
        }),
    ))
}

pub async fn consume_login_link(
    State(state): State<AppState>,
    Json(payload): Json<ConsumeLoginLinkRequest>,
) -> Result<(StatusCode, Json<PortalSessionResponse>), AppError> {
    let session = state
        .db
        .consume_login_token(&payload.token, state.config.portal_session_ttl_minutes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PortalSessionResponse {
            session_token: session.token,
            contact_id: session.contact_id,
            expires_at: session.expires_at,
        }),
    ))
}

/// Public invoice view. The first view of a sent invoice stamps viewed_at.
pub async fn view_invoice(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let invoice = state.db.view_invoice_by_token(&token).await?;
    let line_items = state.db.get_line_items(invoice.invoice_id).await?;
    let payments = state.db.list_payments(invoice.invoice_id).await?;

    Ok(Json(InvoiceDetail {
        invoice,
        line_items,
        payments,
    }))
}

pub async fn view_contract(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Contract>, AppError> {
    let actor = actor_from_headers(&headers, None);
    Ok(Json(state.db.view_contract_by_token(&token, &actor).await?))
}

pub async fn sign_contract(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<SignContractRequest>,
) -> Result<Json<Contract>, AppError> {
    payload.validate()?;

    let actor = actor_from_headers(&headers, Some(payload.signer_email.clone()));
    let contract = state
        .db
        .sign_contract_by_token(
            &token,
            &payload.signer_name,
            &payload.signer_email,
            &payload.signature,
            payload.agreed_to_terms,
            &actor,
        )
        .await?;

    Ok(Json(contract))
}

pub async fn decline_contract(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<DeclineContractRequest>,
) -> Result<Json<Contract>, AppError> {
    let actor = actor_from_headers(&headers, None);
    let contract = state
        .db
        .decline_contract_by_token(&token, payload.reason.as_deref(), &actor)
        .await?;

    Ok(Json(contract))
}

pub async fn view_booking(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Booking>, AppError> {
    state
        .db
        .get_booking_by_token(&token)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))
}

/// Client-side cancellation through the confirmation token.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .db
        .get_booking_by_token(&token)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

    let booking = state
        .db
        .transition_booking(booking.booking_id, BookingStatus::Cancelled, Some("client"))
        .await?;

    Ok(Json(booking))
}
