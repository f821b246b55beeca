//! Contact CRUD handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateContactRequest, ListContactsQuery, Page, UpdateContactRequest},
    models::{Contact, CreateContact, ListContactsFilter, UpdateContact},
    AppState,
};

pub async fn create_contact(
    State(state): State<AppState>,
    Json(payload): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<Contact>), AppError> {
    payload.validate()?;

    let contact = state
        .db
        .create_contact(&CreateContact {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            phone: payload.phone,
            notes: payload.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Contact>, AppError> {
    let contact = state
        .db
        .get_contact(contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    Ok(Json(contact))
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListContactsQuery>,
) -> Result<Json<Page<Contact>>, AppError> {
    let page_size = query.page_size.unwrap_or(50);
    let contacts = state
        .db
        .list_contacts(&ListContactsFilter {
            archived: query.archived,
            search: query.search,
            page_size,
            page_token: query.page_token,
        })
        .await?;

    Ok(Json(Page::new(contacts, page_size, |c| c.contact_id)))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
    Json(payload): Json<UpdateContactRequest>,
) -> Result<Json<Contact>, AppError> {
    payload.validate()?;

    let contact = state
        .db
        .update_contact(
            contact_id,
            &UpdateContact {
                first_name: payload.first_name,
                last_name: payload.last_name,
                email: payload.email,
                phone: payload.phone,
                notes: payload.notes,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contact not found")))?;

    Ok(Json(contact))
}

/// Archive rather than delete: bookings, invoices, and contracts keep their
/// reference to the contact.
pub async fn archive_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let archived = state.db.archive_contact(contact_id).await?;
    if !archived {
        return Err(AppError::NotFound(anyhow::anyhow!("Contact not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
