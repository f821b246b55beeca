//! Booking type and booking models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Bookable session type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingType {
    pub booking_type_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub buffer_before_minutes: i32,
    pub buffer_after_minutes: i32,
    pub requires_confirmation: bool,
    pub min_notice_hours: i32,
    pub max_advance_days: i32,
    pub price: Option<Decimal>,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBookingType {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub buffer_before_minutes: i32,
    pub buffer_after_minutes: i32,
    pub requires_confirmation: bool,
    pub min_notice_hours: i32,
    pub max_advance_days: i32,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBookingType {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub buffer_before_minutes: Option<i32>,
    pub buffer_after_minutes: Option<i32>,
    pub requires_confirmation: Option<bool>,
    pub min_notice_hours: Option<i32>,
    pub max_advance_days: Option<i32>,
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "completed" => BookingStatus::Completed,
            "cancelled" => BookingStatus::Cancelled,
            "no_show" => BookingStatus::NoShow,
            _ => BookingStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Whether a transition to `next` is allowed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }
}

/// Booking row. Rows are never hard-deleted; cancellation stamps the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub booking_id: Uuid,
    pub booking_type_id: Uuid,
    pub contact_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub confirmation_token: String,
    pub notes: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub booking_type_id: Uuid,
    pub contact_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListBookingsFilter {
    pub status: Option<BookingStatus>,
    pub contact_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_matrix() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Cancelled));
    }
}
