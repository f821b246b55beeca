use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct CreateContractTemplateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateContractTemplateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct CreateContractRequest {
    pub template_id: Uuid,
    pub contact_id: Uuid,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[serde(default = "empty_object")]
    pub merge_data: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

#[derive(Deserialize, Default)]
pub struct ListContractsQuery {
    pub status: Option<String>,
    pub contact_id: Option<Uuid>,
}

#[derive(Deserialize, Default)]
pub struct VoidContractRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SignContractRequest {
    #[validate(length(min = 1, max = 200))]
    pub signer_name: String,
    #[validate(email)]
    pub signer_email: String,
    /// Typed or drawn signature payload; only its hash is persisted.
    #[validate(length(min = 1))]
    pub signature: String,
    pub agreed_to_terms: bool,
}

#[derive(Deserialize, Default)]
pub struct DeclineContractRequest {
    pub reason: Option<String>,
}
