use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Invoice, LineItem, Payment};

#[derive(Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub contact_id: Uuid,
    #[validate(length(equal = 3))]
    #[serde(default = "default_currency")]
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub discount: Decimal,
    pub tax_rate: Option<Decimal>,
    pub notes: Option<String>,
    #[validate(length(min = 1), nested)]
    pub line_items: Vec<LineItemRequest>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Serialize, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Deserialize, Default)]
pub struct ListInvoicesQuery {
    pub status: Option<String>,
    pub contact_id: Option<Uuid>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}

#[derive(Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Invoice with its line items and recorded payments.
#[derive(Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub line_items: Vec<LineItem>,
    pub payments: Vec<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn invoice_request_requires_at_least_one_line_item() {
        let request = CreateInvoiceRequest {
            contact_id: Uuid::new_v4(),
            currency: "USD".to_string(),
            due_date: None,
            discount: Decimal::ZERO,
            tax_rate: None,
            notes: None,
            line_items: vec![],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("line_items"));
    }

    #[test]
    fn invoice_request_with_line_items_validates() {
        let request = CreateInvoiceRequest {
            contact_id: Uuid::new_v4(),
            currency: "USD".to_string(),
            due_date: None,
            discount: Decimal::ZERO,
            tax_rate: None,
            notes: None,
            line_items: vec![LineItemRequest {
                description: "Coaching session".to_string(),
                quantity: d("1"),
                unit_price: d("150.00"),
            }],
        };
        assert!(request.validate().is_ok());
    }
}
