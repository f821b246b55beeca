//! Booking handlers: slot claim, lifecycle transitions, reminder sweep.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CancelBookingRequest, CreateBookingRequest, ListBookingsQuery, Page, ReminderSweepRequest},
    models::{Booking, BookingStatus, CreateBooking, ListBookingsFilter},
    AppState,
};

pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    payload.validate()?;

    state
        .db
        .get_contact(payload.contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    tracing::info!(
        booking_type_id = %payload.booking_type_id,
        contact_id = %payload.contact_id,
        start_time = %payload.start_time,
        "Claiming booking slot"
    );

    let booking = state
        .db
        .claim_booking(
            &CreateBooking {
                booking_type_id: payload.booking_type_id,
                contact_id: payload.contact_id,
                start_time: payload.start_time,
                notes: payload.notes,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .db
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

    Ok(Json(booking))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Page<Booking>>, AppError> {
    let page_size = query.page_size.unwrap_or(50);
    let bookings = state
        .db
        .list_bookings(&ListBookingsFilter {
            status: query.status.as_deref().map(BookingStatus::from_string),
            contact_id: query.contact_id,
            from: query.from,
            to: query.to,
            page_size,
            page_token: query.page_token,
        })
        .await?;

    Ok(Json(Page::new(bookings, page_size, |b| b.booking_id)))
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .db
        .transition_booking(booking_id, BookingStatus::Confirmed, None)
        .await?;
    Ok(Json(booking))
}

pub async fn complete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .db
        .transition_booking(booking_id, BookingStatus::Completed, None)
        .await?;
    Ok(Json(booking))
}

pub async fn no_show_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .db
        .transition_booking(booking_id, BookingStatus::NoShow, None)
        .await?;
    Ok(Json(booking))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CancelBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .db
        .transition_booking(
            booking_id,
            BookingStatus::Cancelled,
            payload.cancelled_by.as_deref().or(Some("coach")),
        )
        .await?;
    Ok(Json(booking))
}

/// Stamp and return confirmed bookings whose reminder is due. Idempotent:
/// the stamp prevents double sends by the single periodic runner.
pub async fn sweep_reminders(
    State(state): State<AppState>,
    Json(payload): Json<ReminderSweepRequest>,
) -> Result<Json<Vec<Booking>>, AppError> {
    payload.validate()?;

    let bookings = state
        .db
        .sweep_due_reminders(Utc::now(), payload.horizon_hours)
        .await?;

    Ok(Json(bookings))
}
