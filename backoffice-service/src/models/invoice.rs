//! Invoice and line-item models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => InvoiceStatus::Sent,
            "viewed" => InvoiceStatus::Viewed,
            "partial" => InvoiceStatus::Partial,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Draft,
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Statuses against which a payment may be recorded.
    pub fn is_payable(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent
                | InvoiceStatus::Viewed
                | InvoiceStatus::Partial
                | InvoiceStatus::Overdue
        )
    }
}

/// Invoice row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_number: Option<String>,
    pub contact_id: Uuid,
    pub status: String,
    pub currency: String,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub discount: Decimal,
    pub tax_rate: Option<Decimal>,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub notes: Option<String>,
    pub view_token: String,
    pub viewed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

/// Line item row, owned by an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub position: i32,
    pub created_utc: DateTime<Utc>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub contact_id: Option<Uuid>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

/// Input for creating an invoice with its line items.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub contact_id: Uuid,
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    pub discount: Decimal,
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
    pub line_items: Vec<CreateLineItem>,
}

#[derive(Debug, Clone)]
pub struct CreateLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_string() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Viewed,
            InvoiceStatus::Partial,
            InvoiceStatus::Paid,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
        ] {
            assert_eq!(InvoiceStatus::from_string(status.as_str()), status);
        }
    }

    #[test]
    fn draft_and_cancelled_are_not_payable() {
        assert!(!InvoiceStatus::Draft.is_payable());
        assert!(!InvoiceStatus::Cancelled.is_payable());
        assert!(!InvoiceStatus::Paid.is_payable());
        assert!(InvoiceStatus::Sent.is_payable());
        assert!(InvoiceStatus::Overdue.is_payable());
    }
}
