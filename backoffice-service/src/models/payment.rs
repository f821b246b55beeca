//! Payment model. Rows are immutable once written; removal re-derives the
//! owning invoice's balance and status.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a payment against an invoice.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
}
