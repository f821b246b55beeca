//! Booking-type handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateBookingTypeRequest, ListBookingTypesQuery, UpdateBookingTypeRequest},
    models::{BookingType, CreateBookingType, UpdateBookingType},
    AppState,
};

pub async fn create_booking_type(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingTypeRequest>,
) -> Result<(StatusCode, Json<BookingType>), AppError> {
    payload.validate()?;

    let booking_type = state
        .db
        .create_booking_type(&CreateBookingType {
            name: payload.name,
            description: payload.description,
            duration_minutes: payload.duration_minutes,
            buffer_before_minutes: payload.buffer_before_minutes,
            buffer_after_minutes: payload.buffer_after_minutes,
            requires_confirmation: payload.requires_confirmation,
            min_notice_hours: payload.min_notice_hours,
            max_advance_days: payload.max_advance_days,
            price: payload.price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(booking_type)))
}

pub async fn get_booking_type(
    State(state): State<AppState>,
    Path(booking_type_id): Path<Uuid>,
) -> Result<Json<BookingType>, AppError> {
    let booking_type = state
        .db
        .get_booking_type(booking_type_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking type not found")))?;

    Ok(Json(booking_type))
}

pub async fn list_booking_types(
    State(state): State<AppState>,
    Query(query): Query<ListBookingTypesQuery>,
) -> Result<Json<Vec<BookingType>>, AppError> {
    let booking_types = state.db.list_booking_types(query.active_only).await?;
    Ok(Json(booking_types))
}

pub async fn update_booking_type(
    State(state): State<AppState>,
    Path(booking_type_id): Path<Uuid>,
    Json(payload): Json<UpdateBookingTypeRequest>,
) -> Result<Json<BookingType>, AppError> {
    payload.validate()?;

    let booking_type = state
        .db
        .update_booking_type(
            booking_type_id,
            &UpdateBookingType {
                name: payload.name,
                description: payload.description,
                duration_minutes: payload.duration_minutes,
                buffer_before_minutes: payload.buffer_before_minutes,
                buffer_after_minutes: payload.buffer_after_minutes,
                requires_confirmation: payload.requires_confirmation,
                min_notice_hours: payload.min_notice_hours,
                max_advance_days: payload.max_advance_days,
                price: payload.price,
                active: payload.active,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking type not found")))?;

    Ok(Json(booking_type))
}
