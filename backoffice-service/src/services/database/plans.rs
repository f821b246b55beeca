//! Payment-plan and installment repository operations.

use super::Database;
use crate::models::{
    CreatePaymentPlan, Installment, InstallmentStatus, InvoiceStatus, PaymentPlan, PlanStatus,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::schedule;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

const PLAN_COLUMNS: &str = "plan_id, invoice_id, total_amount, number_of_payments, frequency, \
    start_date, status, created_utc, completed_utc";

const INSTALLMENT_COLUMNS: &str =
    "installment_id, plan_id, sequence, due_date, amount, status, payment_id, paid_utc";

impl Database {
    /// Create a payment plan on an invoice and persist its generated
    /// schedule in one transaction.
    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id))]
    pub async fn create_payment_plan(
        &self,
        input: &CreatePaymentPlan,
    ) -> Result<(PaymentPlan, Vec<Installment>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_payment_plan"])
            .start_timer();

        let invoice = self
            .get_invoice(input.invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
        if InvoiceStatus::from_string(&invoice.status).is_terminal() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot add a payment plan to a {} invoice",
                invoice.status
            )));
        }

        let installments = schedule::build_schedule(
            input.total_amount,
            input.number_of_payments,
            input.frequency,
            input.start_date,
        )?;

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let plan_id = Uuid::new_v4();
        let plan = sqlx::query_as::<_, PaymentPlan>(&format!(
            r#"
            INSERT INTO payment_plans (plan_id, invoice_id, total_amount, number_of_payments, frequency, start_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'active')
            RETURNING {PLAN_COLUMNS}
            "#,
        ))
        .bind(plan_id)
        .bind(input.invoice_id)
        .bind(input.total_amount)
        .bind(input.number_of_payments)
        .bind(input.frequency.as_str())
        .bind(input.start_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Invoice already has a payment plan"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create plan: {}", e)),
        })?;

        let mut rows = Vec::with_capacity(installments.len());
        for installment in &installments {
            let row = sqlx::query_as::<_, Installment>(&format!(
                r#"
                INSERT INTO installments (installment_id, plan_id, sequence, due_date, amount, status)
                VALUES ($1, $2, $3, $4, $5, 'pending')
                RETURNING {INSTALLMENT_COLUMNS}
                "#,
            ))
            .bind(Uuid::new_v4())
            .bind(plan_id)
            .bind(installment.sequence)
            .bind(installment.due_date)
            .bind(installment.amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert installment: {}", e))
            })?;
            rows.push(row);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit plan: {}", e))
        })?;

        timer.observe_duration();

        info!(
            plan_id = %plan.plan_id,
            installments = rows.len(),
            total = %plan.total_amount,
            "Payment plan created"
        );

        Ok((plan, rows))
    }

    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn get_payment_plan(&self, plan_id: Uuid) -> Result<Option<PaymentPlan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment_plan"])
            .start_timer();

        let plan = sqlx::query_as::<_, PaymentPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM payment_plans WHERE plan_id = $1"
        ))
        .bind(plan_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get plan: {}", e)))?;

        timer.observe_duration();

        Ok(plan)
    }

    /// The plan attached to an invoice, if any.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_plan_for_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Option<PaymentPlan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_plan_for_invoice"])
            .start_timer();

        let plan = sqlx::query_as::<_, PaymentPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM payment_plans WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get plan: {}", e)))?;

        timer.observe_duration();

        Ok(plan)
    }

    /// Installments for a plan, in sequence order.
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn list_installments(&self, plan_id: Uuid) -> Result<Vec<Installment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_installments"])
            .start_timer();

        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE plan_id = $1 ORDER BY sequence"
        ))
        .bind(plan_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list installments: {}", e))
        })?;

        timer.observe_duration();

        Ok(installments)
    }

    /// First installment still pending, in sequence order; None if the plan
    /// is exhausted.
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn get_next_due_installment(
        &self,
        plan_id: Uuid,
    ) -> Result<Option<Installment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_next_due_installment"])
            .start_timer();

        let installment = sqlx::query_as::<_, Installment>(&format!(
            r#"
            SELECT {INSTALLMENT_COLUMNS}
            FROM installments
            WHERE plan_id = $1 AND status = 'pending'
            ORDER BY sequence
            LIMIT 1
            "#,
        ))
        .bind(plan_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get next installment: {}", e))
        })?;

        timer.observe_duration();

        Ok(installment)
    }

    /// Mark an installment paid and link the payment. One-way; when the last
    /// installment settles, the plan completes in the same transaction.
    #[instrument(skip(self), fields(plan_id = %plan_id, sequence = sequence))]
    pub async fn mark_installment_paid(
        &self,
        plan_id: Uuid,
        sequence: i32,
        payment_id: Option<Uuid>,
    ) -> Result<(Installment, PaymentPlan), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_installment_paid"])
            .start_timer();

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let plan = sqlx::query_as::<_, PaymentPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM payment_plans WHERE plan_id = $1 FOR UPDATE"
        ))
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get plan: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment plan not found")))?;

        if PlanStatus::from_string(&plan.status) != PlanStatus::Active {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment plan is {}",
                plan.status
            )));
        }

        let existing = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE plan_id = $1 AND sequence = $2"
        ))
        .bind(plan_id)
        .bind(sequence)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get installment: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Installment not found")))?;

        if InstallmentStatus::from_string(&existing.status) == InstallmentStatus::Paid {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Installment {} is already paid",
                sequence
            )));
        }

        let installment = sqlx::query_as::<_, Installment>(&format!(
            r#"
            UPDATE installments
            SET status = 'paid', payment_id = $3, paid_utc = NOW()
            WHERE plan_id = $1 AND sequence = $2
            RETURNING {INSTALLMENT_COLUMNS}
            "#,
        ))
        .bind(plan_id)
        .bind(sequence)
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark installment paid: {}", e))
        })?;

        let (remaining,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM installments WHERE plan_id = $1 AND status <> 'paid'",
        )
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count installments: {}", e))
        })?;

        let plan = if remaining == 0 {
            sqlx::query_as::<_, PaymentPlan>(&format!(
                r#"
                UPDATE payment_plans
                SET status = 'completed', completed_utc = NOW()
                WHERE plan_id = $1
                RETURNING {PLAN_COLUMNS}
                "#,
            ))
            .bind(plan_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to complete plan: {}", e))
            })?
        } else {
            plan
        };

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit installment: {}", e))
        })?;

        timer.observe_duration();

        info!(
            plan_id = %plan.plan_id,
            sequence = sequence,
            plan_status = %plan.status,
            "Installment paid"
        );

        Ok((installment, plan))
    }

    /// Cancel an active plan; installment history stays intact.
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn cancel_payment_plan(&self, plan_id: Uuid) -> Result<PaymentPlan, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_payment_plan"])
            .start_timer();

        let plan = sqlx::query_as::<_, PaymentPlan>(&format!(
            r#"
            UPDATE payment_plans
            SET status = 'cancelled'
            WHERE plan_id = $1 AND status = 'active'
            RETURNING {PLAN_COLUMNS}
            "#,
        ))
        .bind(plan_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to cancel plan: {}", e)))?;

        timer.observe_duration();

        match plan {
            Some(plan) => {
                info!(plan_id = %plan.plan_id, "Payment plan cancelled");
                Ok(plan)
            }
            None => match self.get_payment_plan(plan_id).await? {
                Some(existing) => Err(AppError::BadRequest(anyhow::anyhow!(
                    "Payment plan is {}",
                    existing.status
                ))),
                None => Err(AppError::NotFound(anyhow::anyhow!("Payment plan not found"))),
            },
        }
    }
}
