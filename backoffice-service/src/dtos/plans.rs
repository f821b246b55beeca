use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Installment, PaymentPlan};

#[derive(Deserialize, Validate)]
pub struct CreatePaymentPlanRequest {
    pub total_amount: Decimal,
    #[validate(range(min = 1, max = 60))]
    pub number_of_payments: i32,
    /// One of weekly, bi_weekly, monthly.
    pub frequency: String,
    pub start_date: NaiveDate,
}

#[derive(Deserialize, Default)]
pub struct PayInstallmentRequest {
    pub payment_id: Option<Uuid>,
}

/// Payment plan with its ordered installments.
#[derive(Serialize)]
pub struct PaymentPlanDetail {
    #[serde(flatten)]
    pub plan: PaymentPlan,
    pub installments: Vec<Installment>,
}
