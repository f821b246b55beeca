//! Weekly availability rules and date-specific overrides.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Recurring weekly window; day_of_week is 0 (Monday) through 6 (Sunday).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvailabilityRule {
    pub rule_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAvailabilityRule {
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Date-specific override. `is_available=false` with no times blocks the
/// whole day; with times it narrows the day to the given window.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AvailabilityOverride {
    pub override_id: Uuid,
    pub date: NaiveDate,
    pub is_available: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAvailabilityOverride {
    pub date: NaiveDate,
    pub is_available: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
}
