//! Contact repository operations.

use super::Database;
use crate::models::{Contact, CreateContact, ListContactsFilter, UpdateContact};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

const CONTACT_COLUMNS: &str = "contact_id, first_name, last_name, email, phone, notes, archived, created_utc, updated_utc";

impl Database {
    /// Create a new contact.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_contact(&self, input: &CreateContact) -> Result<Contact, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_contact"])
            .start_timer();

        let contact = sqlx::query_as::<_, Contact>(&format!(
            r#"
            INSERT INTO contacts (contact_id, first_name, last_name, email, phone, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTACT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.notes)
        .fetch_one(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "A contact with email '{}' already exists",
                    input.email
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create contact: {}", e)),
        })?;

        timer.observe_duration();

        info!(contact_id = %contact.contact_id, "Contact created");

        Ok(contact)
    }

    /// Get a contact by ID.
    #[instrument(skip(self), fields(contact_id = %contact_id))]
    pub async fn get_contact(&self, contact_id: Uuid) -> Result<Option<Contact>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_contact"])
            .start_timer();

        let contact = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE contact_id = $1"
        ))
        .bind(contact_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get contact: {}", e)))?;

        timer.observe_duration();

        Ok(contact)
    }

    /// List contacts with keyset pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_contacts(
        &self,
        filter: &ListContactsFilter,
    ) -> Result<Vec<Contact>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_contacts"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let search = filter.search.as_ref().map(|s| format!("%{}%", s));

        let contacts = sqlx::query_as::<_, Contact>(&format!(
            r#"
            SELECT {CONTACT_COLUMNS}
            FROM contacts
            WHERE ($1::boolean IS NULL OR archived = $1)
              AND ($2::text IS NULL OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
              AND ($3::uuid IS NULL OR contact_id > $3)
            ORDER BY contact_id
            LIMIT $4
            "#,
        ))
        .bind(filter.archived)
        .bind(search)
        .bind(filter.page_token)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list contacts: {}", e)))?;

        timer.observe_duration();

        Ok(contacts)
    }

    /// Update a contact; None fields are left untouched.
    #[instrument(skip(self, input), fields(contact_id = %contact_id))]
    pub async fn update_contact(
        &self,
        contact_id: Uuid,
        input: &UpdateContact,
    ) -> Result<Option<Contact>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_contact"])
            .start_timer();

        let contact = sqlx::query_as::<_, Contact>(&format!(
            r#"
            UPDATE contacts
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                notes = COALESCE($6, notes),
                updated_utc = NOW()
            WHERE contact_id = $1
            RETURNING {CONTACT_COLUMNS}
            "#,
        ))
        .bind(contact_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.notes)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("A contact with that email already exists"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update contact: {}", e)),
        })?;

        timer.observe_duration();

        Ok(contact)
    }

    /// Archive a contact (soft delete; bookings/invoices keep their reference).
    #[instrument(skip(self), fields(contact_id = %contact_id))]
    pub async fn archive_contact(&self, contact_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["archive_contact"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE contacts SET archived = TRUE, updated_utc = NOW() WHERE contact_id = $1",
        )
        .bind(contact_id)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to archive contact: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}
