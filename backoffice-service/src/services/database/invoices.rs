//! Invoice, line-item, and payment repository operations.

use super::Database;
use crate::models::{
    CreateInvoice, CreatePayment, Invoice, InvoiceStatus, LineItem, ListInvoicesFilter, Payment,
};
use crate::services::ledger;
use crate::services::metrics::{DB_QUERY_DURATION, INVOICES_TOTAL, PAYMENTS_TOTAL};
use crate::services::tokens;
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, invoice_number, contact_id, status, currency, \
    issue_date, due_date, discount, tax_rate, subtotal, tax_total, total, amount_paid, \
    balance_due, notes, view_token, viewed_at, sent_at, cancelled_at, created_utc";

const LINE_ITEM_COLUMNS: &str =
    "line_item_id, invoice_id, description, quantity, unit_price, position, created_utc";

const PAYMENT_COLUMNS: &str = "payment_id, invoice_id, amount, payment_method, payment_date, \
    reference, notes, created_utc";

impl Database {
    /// Create a draft invoice together with its line items. Totals are
    /// derived from the items before anything is written.
    #[instrument(skip(self, input), fields(contact_id = %input.contact_id))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        if input.line_items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "An invoice needs at least one line item"
            )));
        }

        let totals = ledger::compute_totals(&input.line_items, input.discount, input.tax_rate);

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let invoice_id = Uuid::new_v4();
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, contact_id, status, currency, due_date, discount, tax_rate,
                subtotal, tax_total, total, amount_paid, balance_due, notes, view_token
            )
            VALUES ($1, $2, 'draft', $3, $4, $5, $6, $7, $8, $9, 0, $9, $10, $11)
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(input.contact_id)
        .bind(&input.currency)
        .bind(input.due_date)
        .bind(input.discount)
        .bind(input.tax_rate)
        .bind(totals.subtotal)
        .bind(totals.tax_total)
        .bind(totals.total)
        .bind(&input.notes)
        .bind(tokens::generate_token())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        for (position, item) in input.line_items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO line_items (line_item_id, invoice_id, description, quantity, unit_price, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert line item: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice: {}", e))
        })?;

        timer.observe_duration();
        INVOICES_TOTAL.with_label_values(&["draft"]).inc();

        info!(invoice_id = %invoice.invoice_id, total = %invoice.total, "Invoice created");

        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List invoices with keyset pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR contact_id = $2)
              AND ($3::uuid IS NULL OR invoice_id > $3)
            ORDER BY invoice_id
            LIMIT $4
            "#,
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.contact_id)
        .bind(filter.page_token)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Line items for an invoice, in position order.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_items"])
            .start_timer();

        let items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE invoice_id = $1 ORDER BY position"
        ))
        .bind(invoice_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }

    /// Send a draft invoice: assigns the number and stamps sent_at.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn send_invoice(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["send_invoice"])
            .start_timer();

        let existing = self
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
        if InvoiceStatus::from_string(&existing.status) != InvoiceStatus::Draft {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Only draft invoices can be sent"
            )));
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET invoice_number = 'INV-' || LPAD(nextval('invoice_number_seq')::text, 5, '0'),
                status = 'sent',
                issue_date = CURRENT_DATE,
                sent_at = NOW()
            WHERE invoice_id = $1 AND status = 'draft'
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to send invoice: {}", e)))?
        .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Invoice changed concurrently")))?;

        timer.observe_duration();
        INVOICES_TOTAL.with_label_values(&["sent"]).inc();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number.as_deref().unwrap_or(""),
            "Invoice sent"
        );

        Ok(invoice)
    }

    /// Cancel an invoice. Terminal; payments are no longer accepted.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn cancel_invoice(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_invoice"])
            .start_timer();

        let existing = self
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
        let status = InvoiceStatus::from_string(&existing.status);
        if status.is_terminal() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice in status '{}' cannot be cancelled",
                status.as_str()
            )));
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = 'cancelled', cancelled_at = NOW()
            WHERE invoice_id = $1 AND status = $2
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to cancel invoice: {}", e)))?
        .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Invoice changed concurrently")))?;

        timer.observe_duration();
        INVOICES_TOTAL.with_label_values(&["cancelled"]).inc();

        info!(invoice_id = %invoice.invoice_id, "Invoice cancelled");

        Ok(invoice)
    }

    /// Record a payment. Validation happens against the stored balance, and
    /// the payment insert plus the invoice re-derivation share a transaction
    /// so an invalid payment never partially applies.
    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id, amount = %input.amount))]
    pub async fn record_payment(&self, input: &CreatePayment) -> Result<Payment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE"
        ))
        .bind(input.invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        let status = InvoiceStatus::from_string(&invoice.status);
        ledger::validate_payment(status, input.amount, invoice.balance_due)?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (payment_id, invoice_id, amount, payment_method, payment_date, reference, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(input.invoice_id)
        .bind(input.amount)
        .bind(&input.payment_method)
        .bind(input.payment_date)
        .bind(&input.reference)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))?;

        let amount_paid = invoice.amount_paid + input.amount;
        let balance = ledger::balance_due(invoice.total, amount_paid);
        let next_status = ledger::status_after_payment(invoice.total, amount_paid);

        sqlx::query(
            r#"
            UPDATE invoices
            SET amount_paid = $2, balance_due = $3, status = $4
            WHERE invoice_id = $1
            "#,
        )
        .bind(input.invoice_id)
        .bind(amount_paid)
        .bind(balance)
        .bind(next_status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit payment: {}", e))
        })?;

        timer.observe_duration();
        PAYMENTS_TOTAL
            .with_label_values(&[input.payment_method.as_str()])
            .inc();

        info!(
            payment_id = %payment.payment_id,
            amount = %payment.amount,
            status = next_status.as_str(),
            "Payment recorded"
        );

        Ok(payment)
    }

    /// Remove a payment and re-derive the invoice's paid amount and status.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, payment_id = %payment_id))]
    pub async fn remove_payment(
        &self,
        invoice_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_payment"])
            .start_timer();

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE"
        ))
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        ledger::validate_payment_removal(InvoiceStatus::from_string(&invoice.status))?;

        let deleted = sqlx::query(
            "DELETE FROM payments WHERE payment_id = $1 AND invoice_id = $2",
        )
        .bind(payment_id)
        .bind(invoice_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to remove payment: {}", e)))?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Payment not found")));
        }

        let (amount_paid,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e)))?;

        let balance = ledger::balance_due(invoice.total, amount_paid);
        let next_status = ledger::status_after_removal(amount_paid, invoice.viewed_at.is_some());

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET amount_paid = $2, balance_due = $3, status = $4
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(amount_paid)
        .bind(balance)
        .bind(next_status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit removal: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            amount_paid = %invoice.amount_paid,
            status = %invoice.status,
            "Payment removed"
        );

        Ok(invoice)
    }

    /// Payments recorded against an invoice, oldest first.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 ORDER BY created_utc"
        ))
        .bind(invoice_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    /// Public view through the invoice's reusable token. The first view of a
    /// sent invoice stamps viewed_at and moves it to viewed, exactly once.
    #[instrument(skip(self, token))]
    pub async fn view_invoice_by_token(&self, token: &str) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["view_invoice_by_token"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE view_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        match InvoiceStatus::from_string(&invoice.status) {
            InvoiceStatus::Cancelled => {
                return Err(AppError::Gone(anyhow::anyhow!("Invoice has been cancelled")))
            }
            InvoiceStatus::Draft => {
                return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")))
            }
            InvoiceStatus::Sent => {
                // first view, stamp exactly once
                let stamped = sqlx::query_as::<_, Invoice>(&format!(
                    r#"
                    UPDATE invoices
                    SET status = 'viewed', viewed_at = NOW()
                    WHERE invoice_id = $1 AND status = 'sent' AND viewed_at IS NULL
                    RETURNING {INVOICE_COLUMNS}
                    "#,
                ))
                .bind(invoice.invoice_id)
                .fetch_optional(self.pool())
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to stamp view: {}", e))
                })?;

                timer.observe_duration();
                return Ok(stamped.unwrap_or(invoice));
            }
            _ => {}
        }

        timer.observe_duration();

        Ok(invoice)
    }

    /// Idempotent sweep: move sent/viewed/partial invoices past their due
    /// date to overdue. Driven by the external cron collaborator.
    #[instrument(skip(self))]
    pub async fn sweep_overdue_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["sweep_overdue_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = 'overdue'
            WHERE status IN ('sent', 'viewed', 'partial')
              AND due_date IS NOT NULL
              AND due_date < CURRENT_DATE
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Overdue sweep failed: {}", e)))?;

        timer.observe_duration();

        info!(count = invoices.len(), "Overdue sweep updated invoices");

        Ok(invoices)
    }
}
