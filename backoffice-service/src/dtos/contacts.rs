use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ListContactsQuery {
    pub archived: Option<bool>,
    pub search: Option<String>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}
