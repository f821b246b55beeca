//! Payment plan and installment models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Installment cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanFrequency {
    Weekly,
    BiWeekly,
    Monthly,
}

impl PlanFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanFrequency::Weekly => "weekly",
            PlanFrequency::BiWeekly => "bi_weekly",
            PlanFrequency::Monthly => "monthly",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(PlanFrequency::Weekly),
            "bi_weekly" => Some(PlanFrequency::BiWeekly),
            "monthly" => Some(PlanFrequency::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "completed" => PlanStatus::Completed,
            "cancelled" => PlanStatus::Cancelled,
            _ => PlanStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Paid => "paid",
            InstallmentStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paid" => InstallmentStatus::Paid,
            "overdue" => InstallmentStatus::Overdue,
            _ => InstallmentStatus::Pending,
        }
    }
}

/// Payment plan row, owned 1:1 by an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentPlan {
    pub plan_id: Uuid,
    pub invoice_id: Uuid,
    pub total_amount: Decimal,
    pub number_of_payments: i32,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub status: String,
    pub created_utc: DateTime<Utc>,
    pub completed_utc: Option<DateTime<Utc>>,
}

/// Installment row; sequence is 1-based within the plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Installment {
    pub installment_id: Uuid,
    pub plan_id: Uuid,
    pub sequence: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub status: String,
    pub payment_id: Option<Uuid>,
    pub paid_utc: Option<DateTime<Utc>>,
}

/// Input for creating a payment plan on an invoice.
#[derive(Debug, Clone)]
pub struct CreatePaymentPlan {
    pub invoice_id: Uuid,
    pub total_amount: Decimal,
    pub number_of_payments: i32,
    pub frequency: PlanFrequency,
    pub start_date: NaiveDate,
}
