//! Availability rule and override repository operations.

use super::Database;
use crate::models::{
    AvailabilityOverride, AvailabilityRule, CreateAvailabilityOverride, CreateAvailabilityRule,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::NaiveDate;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    /// Create a weekly availability rule.
    #[instrument(skip(self, input), fields(day_of_week = input.day_of_week))]
    pub async fn create_availability_rule(
        &self,
        input: &CreateAvailabilityRule,
    ) -> Result<AvailabilityRule, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_availability_rule"])
            .start_timer();

        let rule = sqlx::query_as::<_, AvailabilityRule>(
            r#"
            INSERT INTO availability_rules (rule_id, day_of_week, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            RETURNING rule_id, day_of_week, start_time, end_time, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.day_of_week)
        .bind(input.start_time)
        .bind(input.end_time)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create availability rule: {}", e))
        })?;

        timer.observe_duration();

        info!(rule_id = %rule.rule_id, "Availability rule created");

        Ok(rule)
    }

    /// List all weekly availability rules.
    #[instrument(skip(self))]
    pub async fn list_availability_rules(&self) -> Result<Vec<AvailabilityRule>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_availability_rules"])
            .start_timer();

        let rules = sqlx::query_as::<_, AvailabilityRule>(
            r#"
            SELECT rule_id, day_of_week, start_time, end_time, created_utc
            FROM availability_rules
            ORDER BY day_of_week, start_time
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list availability rules: {}", e))
        })?;

        timer.observe_duration();

        Ok(rules)
    }

    /// Delete a weekly availability rule.
    #[instrument(skip(self), fields(rule_id = %rule_id))]
    pub async fn delete_availability_rule(&self, rule_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_availability_rule"])
            .start_timer();

        let result = sqlx::query("DELETE FROM availability_rules WHERE rule_id = $1")
            .bind(rule_id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete rule: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    /// Create a date-specific availability override.
    #[instrument(skip(self, input), fields(date = %input.date))]
    pub async fn create_availability_override(
        &self,
        input: &CreateAvailabilityOverride,
    ) -> Result<AvailabilityOverride, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_availability_override"])
            .start_timer();

        let row = sqlx::query_as::<_, AvailabilityOverride>(
            r#"
            INSERT INTO availability_overrides (override_id, date, is_available, start_time, end_time, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING override_id, date, is_available, start_time, end_time, reason, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.date)
        .bind(input.is_available)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.reason)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create override: {}", e))
        })?;

        timer.observe_duration();

        info!(override_id = %row.override_id, "Availability override created");

        Ok(row)
    }

    /// List overrides within a date range (inclusive).
    #[instrument(skip(self))]
    pub async fn list_availability_overrides(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityOverride>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_availability_overrides"])
            .start_timer();

        let overrides = sqlx::query_as::<_, AvailabilityOverride>(
            r#"
            SELECT override_id, date, is_available, start_time, end_time, reason, created_utc
            FROM availability_overrides
            WHERE ($1::date IS NULL OR date >= $1)
              AND ($2::date IS NULL OR date <= $2)
            ORDER BY date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list overrides: {}", e)))?;

        timer.observe_duration();

        Ok(overrides)
    }

    /// Delete an availability override.
    #[instrument(skip(self), fields(override_id = %override_id))]
    pub async fn delete_availability_override(&self, override_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_availability_override"])
            .start_timer();

        let result = sqlx::query("DELETE FROM availability_overrides WHERE override_id = $1")
            .bind(override_id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete override: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}
