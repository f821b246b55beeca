//! Request and response shapes for the HTTP API.

mod bookings;
mod contacts;
mod contracts;
mod invoices;
mod plans;
mod portal;

pub use bookings::*;
pub use contacts::*;
pub use contracts::*;
pub use invoices::*;
pub use plans::*;
pub use portal::*;

use serde::Serialize;

/// Keyset-paginated list envelope.
#[derive(Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<uuid::Uuid>,
}

impl<T> Page<T> {
    /// Wrap a page of rows; `key` extracts the keyset cursor of the last row.
    pub fn new(items: Vec<T>, page_size: i32, key: impl Fn(&T) -> uuid::Uuid) -> Self {
        let next_page_token = if items.len() as i32 >= page_size.clamp(1, 100) {
            items.last().map(&key)
        } else {
            None
        };
        Page {
            items,
            next_page_token,
        }
    }
}
