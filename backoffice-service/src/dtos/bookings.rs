use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct CreateBookingTypeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: i32,
    #[validate(range(min = 0, max = 120))]
    #[serde(default)]
    pub buffer_before_minutes: i32,
    #[validate(range(min = 0, max = 120))]
    #[serde(default)]
    pub buffer_after_minutes: i32,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[validate(range(min = 0, max = 720))]
    #[serde(default)]
    pub min_notice_hours: i32,
    #[validate(range(min = 1, max = 365))]
    #[serde(default = "default_max_advance_days")]
    pub max_advance_days: i32,
    pub price: Option<Decimal>,
}

fn default_max_advance_days() -> i32 {
    60
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateBookingTypeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0, max = 120))]
    pub buffer_before_minutes: Option<i32>,
    #[validate(range(min = 0, max = 120))]
    pub buffer_after_minutes: Option<i32>,
    pub requires_confirmation: Option<bool>,
    #[validate(range(min = 0, max = 720))]
    pub min_notice_hours: Option<i32>,
    #[validate(range(min = 1, max = 365))]
    pub max_advance_days: Option<i32>,
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Deserialize, Default)]
pub struct ListBookingTypesQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub booking_type_id: Uuid,
    pub contact_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub contact_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}

#[derive(Deserialize, Default)]
pub struct CancelBookingRequest {
    pub cancelled_by: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct CreateAvailabilityRuleRequest {
    #[validate(range(min = 0, max = 6))]
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Deserialize)]
pub struct CreateAvailabilityOverrideRequest {
    pub date: NaiveDate,
    pub is_available: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ListOverridesQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize, Validate)]
pub struct ReminderSweepRequest {
    #[validate(range(min = 1, max = 168))]
    #[serde(default = "default_reminder_horizon")]
    pub horizon_hours: i64,
}

fn default_reminder_horizon() -> i64 {
    24
}
