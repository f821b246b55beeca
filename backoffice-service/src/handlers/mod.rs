//! HTTP handlers for backoffice-service.

pub mod availability;
pub mod booking_types;
pub mod bookings;
pub mod contacts;
pub mod contracts;
pub mod invoices;
pub mod portal;
pub mod webhooks;

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;

use crate::{models::AuditActor, services, AppState};

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "backoffice-service" })),
    )
}

pub async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await?;
    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

pub async fn metrics() -> String {
    services::get_metrics()
}

/// Build the audit actor for a request from its forwarding headers.
pub(crate) fn actor_from_headers(headers: &HeaderMap, email: Option<String>) -> AuditActor {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };

    AuditActor {
        email,
        ip_address: header_str("x-forwarded-for")
            .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
            .filter(|v| !v.is_empty()),
        user_agent: header_str("user-agent"),
    }
}
