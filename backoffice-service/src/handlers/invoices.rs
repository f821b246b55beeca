//! Invoice, payment, and payment-plan handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        CreateInvoiceRequest, CreatePaymentPlanRequest, InvoiceDetail, ListInvoicesQuery, Page,
        PayInstallmentRequest, PaymentPlanDetail, RecordPaymentRequest,
    },
    models::{
        CreateInvoice, CreateLineItem, CreatePayment, CreatePaymentPlan, Invoice, InvoiceStatus,
        ListInvoicesFilter, Payment, PlanFrequency,
    },
    AppState,
};

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    payload.validate()?;

    state
        .db
        .get_contact(payload.contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    for item in &payload.line_items {
        if item.quantity <= rust_decimal::Decimal::ZERO
            || item.unit_price < rust_decimal::Decimal::ZERO
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Line item quantities must be positive and prices non-negative"
            )));
        }
    }

    let invoice = state
        .db
        .create_invoice(&CreateInvoice {
            contact_id: payload.contact_id,
            currency: payload.currency,
            due_date: payload.due_date,
            discount: payload.discount,
            tax_rate: payload.tax_rate,
            notes: payload.notes,
            line_items: payload
                .line_items
                .into_iter()
                .map(|li| CreateLineItem {
                    description: li.description,
                    quantity: li.quantity,
                    unit_price: li.unit_price,
                })
                .collect(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let line_items = state.db.get_line_items(invoice_id).await?;
    let payments = state.db.list_payments(invoice_id).await?;

    Ok(Json(InvoiceDetail {
        invoice,
        line_items,
        payments,
    }))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Page<Invoice>>, AppError> {
    let page_size = query.page_size.unwrap_or(50);
    let invoices = state
        .db
        .list_invoices(&ListInvoicesFilter {
            status: query.status.as_deref().map(InvoiceStatus::from_string),
            contact_id: query.contact_id,
            page_size,
            page_token: query.page_token,
        })
        .await?;

    Ok(Json(Page::new(invoices, page_size, |i| i.invoice_id)))
}

pub async fn send_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.db.send_invoice(invoice_id).await?))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.db.cancel_invoice(invoice_id).await?))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    payload.validate()?;

    tracing::info!(
        invoice_id = %invoice_id,
        amount = %payload.amount,
        method = %payload.payment_method,
        "Recording payment"
    );

    let payment = state
        .db
        .record_payment(&CreatePayment {
            invoice_id,
            amount: payload.amount,
            payment_method: payload.payment_method,
            payment_date: payload.payment_date,
            reference: payload.reference,
            notes: payload.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn remove_payment(
    State(state): State<AppState>,
    Path((invoice_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.db.remove_payment(invoice_id, payment_id).await?))
}

/// Idempotent sweep moving past-due open invoices to overdue.
pub async fn sweep_overdue(
    State(state): State<AppState>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(state.db.sweep_overdue_invoices().await?))
}

pub async fn create_payment_plan(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<CreatePaymentPlanRequest>,
) -> Result<(StatusCode, Json<PaymentPlanDetail>), AppError> {
    payload.validate()?;

    let frequency = PlanFrequency::from_string(&payload.frequency).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Unknown frequency '{}'; expected weekly, bi_weekly, or monthly",
            payload.frequency
        ))
    })?;

    let (plan, installments) = state
        .db
        .create_payment_plan(&CreatePaymentPlan {
            invoice_id,
            total_amount: payload.total_amount,
            number_of_payments: payload.number_of_payments,
            frequency,
            start_date: payload.start_date,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentPlanDetail { plan, installments }),
    ))
}

pub async fn get_payment_plan(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<PaymentPlanDetail>, AppError> {
    let plan = state
        .db
        .get_plan_for_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice has no payment plan")))?;
    let installments = state.db.list_installments(plan.plan_id).await?;

    Ok(Json(PaymentPlanDetail { plan, installments }))
}

pub async fn pay_installment(
    State(state): State<AppState>,
    Path((plan_id, sequence)): Path<(Uuid, i32)>,
    Json(payload): Json<PayInstallmentRequest>,
) -> Result<Json<PaymentPlanDetail>, AppError> {
    let (_, plan) = state
        .db
        .mark_installment_paid(plan_id, sequence, payload.payment_id)
        .await?;
    let installments = state.db.list_installments(plan_id).await?;

    Ok(Json(PaymentPlanDetail { plan, installments }))
}

/// First pending installment in sequence order; 404 when exhausted.
pub async fn next_due_installment(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<crate::models::Installment>, AppError> {
    state
        .db
        .get_payment_plan(plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment plan not found")))?;

    let installment = state
        .db
        .get_next_due_installment(plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("All installments are settled")))?;

    Ok(Json(installment))
}

pub async fn cancel_payment_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<crate::models::PaymentPlan>, AppError> {
    Ok(Json(state.db.cancel_payment_plan(plan_id).await?))
}
