//! Booking-type and booking repository operations, including the slot claim.

use super::Database;
use crate::models::{
    Booking, BookingStatus, BookingType, CreateBooking, CreateBookingType, ListBookingsFilter,
    UpdateBookingType,
};
use crate::services::metrics::{BOOKINGS_TOTAL, DB_QUERY_DURATION};
use crate::services::{slots, tokens};
use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

const BOOKING_TYPE_COLUMNS: &str = "booking_type_id, name, description, duration_minutes, \
    buffer_before_minutes, buffer_after_minutes, requires_confirmation, min_notice_hours, \
    max_advance_days, price, active, created_utc";

const BOOKING_COLUMNS: &str = "booking_id, booking_type_id, contact_id, start_time, end_time, \
    status, confirmation_token, notes, cancelled_at, cancelled_by, reminder_sent_at, created_utc";

impl Database {
    /// Create a booking type.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_booking_type(
        &self,
        input: &CreateBookingType,
    ) -> Result<BookingType, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_booking_type"])
            .start_timer();

        let booking_type = sqlx::query_as::<_, BookingType>(&format!(
            r#"
            INSERT INTO booking_types (
                booking_type_id, name, description, duration_minutes, buffer_before_minutes,
                buffer_after_minutes, requires_confirmation, min_notice_hours, max_advance_days, price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {BOOKING_TYPE_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.duration_minutes)
        .bind(input.buffer_before_minutes)
        .bind(input.buffer_after_minutes)
        .bind(input.requires_confirmation)
        .bind(input.min_notice_hours)
        .bind(input.max_advance_days)
        .bind(input.price)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create booking type: {}", e))
        })?;

        timer.observe_duration();

        info!(booking_type_id = %booking_type.booking_type_id, "Booking type created");

        Ok(booking_type)
    }

    #[instrument(skip(self), fields(booking_type_id = %booking_type_id))]
    pub async fn get_booking_type(
        &self,
        booking_type_id: Uuid,
    ) -> Result<Option<BookingType>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_booking_type"])
            .start_timer();

        let booking_type = sqlx::query_as::<_, BookingType>(&format!(
            "SELECT {BOOKING_TYPE_COLUMNS} FROM booking_types WHERE booking_type_id = $1"
        ))
        .bind(booking_type_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get booking type: {}", e))
        })?;

        timer.observe_duration();

        Ok(booking_type)
    }

    #[instrument(skip(self))]
    pub async fn list_booking_types(&self, active_only: bool) -> Result<Vec<BookingType>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_booking_types"])
            .start_timer();

        let booking_types = sqlx::query_as::<_, BookingType>(&format!(
            r#"
            SELECT {BOOKING_TYPE_COLUMNS}
            FROM booking_types
            WHERE ($1 = FALSE OR active = TRUE)
            ORDER BY name
            "#,
        ))
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list booking types: {}", e))
        })?;

        timer.observe_duration();

        Ok(booking_types)
    }

    /// Update a booking type; None fields are left untouched.
    #[instrument(skip(self, input), fields(booking_type_id = %booking_type_id))]
    pub async fn update_booking_type(
        &self,
        booking_type_id: Uuid,
        input: &UpdateBookingType,
    ) -> Result<Option<BookingType>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_booking_type"])
            .start_timer();

        let booking_type = sqlx::query_as::<_, BookingType>(&format!(
            r#"
            UPDATE booking_types
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                duration_minutes = COALESCE($4, duration_minutes),
                buffer_before_minutes = COALESCE($5, buffer_before_minutes),
                buffer_after_minutes = COALESCE($6, buffer_after_minutes),
                requires_confirmation = COALESCE($7, requires_confirmation),
                min_notice_hours = COALESCE($8, min_notice_hours),
                max_advance_days = COALESCE($9, max_advance_days),
                price = COALESCE($10, price),
                active = COALESCE($11, active)
            WHERE booking_type_id = $1
            RETURNING {BOOKING_TYPE_COLUMNS}
            "#,
        ))
        .bind(booking_type_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.duration_minutes)
        .bind(input.buffer_before_minutes)
        .bind(input.buffer_after_minutes)
        .bind(input.requires_confirmation)
        .bind(input.min_notice_hours)
        .bind(input.max_advance_days)
        .bind(input.price)
        .bind(input.active)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update booking type: {}", e))
        })?;

        timer.observe_duration();

        Ok(booking_type)
    }

    /// Claim a slot: validate notice, availability, and overlap, then create
    /// the booking with a fresh confirmation token. An advisory lock on the
    /// booking day serializes the overlap check and insert, so two claims
    /// for the same window cannot both pass.
    #[instrument(skip(self, input), fields(booking_type_id = %input.booking_type_id, contact_id = %input.contact_id))]
    pub async fn claim_booking(
        &self,
        input: &CreateBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["claim_booking"])
            .start_timer();

        let booking_type = self
            .get_booking_type(input.booking_type_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking type not found")))?;
        if !booking_type.active {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Booking type is not active"
            )));
        }

        slots::check_notice(
            now,
            input.start_time,
            booking_type.min_notice_hours,
            booking_type.max_advance_days,
        )?;

        let end_time = input.start_time + Duration::minutes(booking_type.duration_minutes as i64);

        let rules = self.list_availability_rules().await?;
        let date = input.start_time.date_naive();
        let overrides = self.list_availability_overrides(Some(date), Some(date)).await?;
        if !slots::fits_availability(input.start_time, end_time, &rules, &overrides) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Requested time is outside the available hours"
            )));
        }

        // Buffers widen the claimed window for the overlap test only.
        let window_start =
            input.start_time - Duration::minutes(booking_type.buffer_before_minutes as i64);
        let window_end = end_time + Duration::minutes(booking_type.buffer_after_minutes as i64);

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        // Serialize claims touching the same day. FOR UPDATE alone locks
        // nothing when the slot is free, so two concurrent claims for the
        // same window could otherwise both pass the overlap check.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(slots::day_lock_key(input.start_time))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to take claim lock: {}", e))
            })?;

        let conflict: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT booking_id FROM bookings
            WHERE status <> 'cancelled'
              AND start_time < $2
              AND end_time > $1
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(window_start)
        .bind(window_end)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Overlap check failed: {}", e)))?;

        if conflict.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "The requested slot is no longer available"
            )));
        }

        let status = if booking_type.requires_confirmation {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        };

        let booking = sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (
                booking_id, booking_type_id, contact_id, start_time, end_time,
                status, confirmation_token, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BOOKING_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(input.booking_type_id)
        .bind(input.contact_id)
        .bind(input.start_time)
        .bind(end_time)
        .bind(status.as_str())
        .bind(tokens::generate_token())
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create booking: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit booking: {}", e))
        })?;

        timer.observe_duration();
        BOOKINGS_TOTAL.with_label_values(&[status.as_str()]).inc();

        info!(
            booking_id = %booking.booking_id,
            start_time = %booking.start_time,
            status = %booking.status,
            "Booking created"
        );

        Ok(booking)
    }

    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_booking"])
            .start_timer();

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get booking: {}", e)))?;

        timer.observe_duration();

        Ok(booking)
    }

    /// Look up a booking by its confirmation token (the portal credential).
    #[instrument(skip(self, token))]
    pub async fn get_booking_by_token(&self, token: &str) -> Result<Option<Booking>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_booking_by_token"])
            .start_timer();

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE confirmation_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get booking: {}", e)))?;

        timer.observe_duration();

        Ok(booking)
    }

    /// List bookings with keyset pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_bookings(
        &self,
        filter: &ListBookingsFilter,
    ) -> Result<Vec<Booking>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_bookings"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;

        let bookings = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR contact_id = $2)
              AND ($3::timestamptz IS NULL OR start_time >= $3)
              AND ($4::timestamptz IS NULL OR start_time <= $4)
              AND ($5::uuid IS NULL OR booking_id > $5)
            ORDER BY booking_id
            LIMIT $6
            "#,
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.contact_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.page_token)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list bookings: {}", e)))?;

        timer.observe_duration();

        Ok(bookings)
    }

    /// Apply a lifecycle transition. Cancellation stamps the row; nothing is
    /// ever deleted.
    #[instrument(skip(self), fields(booking_id = %booking_id, next = next.as_str()))]
    pub async fn transition_booking(
        &self,
        booking_id: Uuid,
        next: BookingStatus,
        cancelled_by: Option<&str>,
    ) -> Result<Booking, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transition_booking"])
            .start_timer();

        let booking = self
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

        let current = BookingStatus::from_string(&booking.status);
        if !current.can_transition_to(next) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot transition booking from '{}' to '{}'",
                current.as_str(),
                next.as_str()
            )));
        }

        let booking = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = $2,
                cancelled_at = CASE WHEN $2 = 'cancelled' THEN NOW() ELSE cancelled_at END,
                cancelled_by = CASE WHEN $2 = 'cancelled' THEN $3 ELSE cancelled_by END
            WHERE booking_id = $1 AND status = $4
            RETURNING {BOOKING_COLUMNS}
            "#,
        ))
        .bind(booking_id)
        .bind(next.as_str())
        .bind(cancelled_by)
        .bind(current.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to transition booking: {}", e))
        })?
        .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Booking changed concurrently")))?;

        timer.observe_duration();
        BOOKINGS_TOTAL.with_label_values(&[next.as_str()]).inc();

        info!(booking_id = %booking.booking_id, status = %booking.status, "Booking transitioned");

        Ok(booking)
    }

    /// Stamp and return confirmed bookings whose reminder is due. The stamp
    /// makes the sweep idempotent for a single periodic runner.
    #[instrument(skip(self))]
    pub async fn sweep_due_reminders(
        &self,
        now: DateTime<Utc>,
        horizon_hours: i64,
    ) -> Result<Vec<Booking>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["sweep_due_reminders"])
            .start_timer();

        let bookings = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET reminder_sent_at = $1
            WHERE status = 'confirmed'
              AND reminder_sent_at IS NULL
              AND start_time > $1
              AND start_time <= $2
            RETURNING {BOOKING_COLUMNS}
            "#,
        ))
        .bind(now)
        .bind(now + Duration::hours(horizon_hours))
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Reminder sweep failed: {}", e)))?;

        timer.observe_duration();

        info!(count = bookings.len(), "Reminder sweep stamped bookings");

        Ok(bookings)
    }
}
