//! Contract templates, contracts, and the signature audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContractTemplate {
    pub template_id: Uuid,
    pub name: String,
    pub content: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateContractTemplate {
    pub name: String,
    pub content: String,
}

/// Contract lifecycle status.
///
/// draft -> sent -> viewed -> { signed | declined | expired };
/// void is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Sent,
    Viewed,
    Signed,
    Expired,
    Declined,
    Void,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Sent => "sent",
            ContractStatus::Viewed => "viewed",
            ContractStatus::Signed => "signed",
            ContractStatus::Expired => "expired",
            ContractStatus::Declined => "declined",
            ContractStatus::Void => "void",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => ContractStatus::Sent,
            "viewed" => ContractStatus::Viewed,
            "signed" => ContractStatus::Signed,
            "expired" => ContractStatus::Expired,
            "declined" => ContractStatus::Declined,
            "void" => ContractStatus::Void,
            _ => ContractStatus::Draft,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ContractStatus::Signed
                | ContractStatus::Expired
                | ContractStatus::Declined
                | ContractStatus::Void
        )
    }

    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        if next == Void {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Draft, Sent)
                | (Sent, Viewed)
                | (Sent, Expired)
                | (Viewed, Signed)
                | (Viewed, Declined)
                | (Viewed, Expired)
        )
    }
}

/// Contract row. Once signed, content and signature fields are immutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub contract_id: Uuid,
    pub template_id: Uuid,
    pub contact_id: Uuid,
    pub title: String,
    pub merge_data: serde_json::Value,
    pub content: Option<String>,
    pub status: String,
    pub signing_token: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub signer_name: Option<String>,
    pub signer_email: Option<String>,
    pub signature_hash: Option<String>,
    pub content_hash: Option<String>,
    pub agreed_to_terms: bool,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateContract {
    pub template_id: Uuid,
    pub contact_id: Uuid,
    pub title: String,
    pub merge_data: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Append-only signature audit entry; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SignatureAuditLog {
    pub audit_id: Uuid,
    pub contract_id: Uuid,
    pub event: String,
    pub actor_email: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub detail: serde_json::Value,
    pub created_utc: DateTime<Utc>,
}

/// Actor context captured on every contract lifecycle event.
#[derive(Debug, Clone, Default)]
pub struct AuditActor {
    pub email: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_reachable_from_non_terminal_only() {
        use ContractStatus::*;
        assert!(Draft.can_transition_to(Void));
        assert!(Sent.can_transition_to(Void));
        assert!(Viewed.can_transition_to(Void));
        assert!(!Signed.can_transition_to(Void));
        assert!(!Declined.can_transition_to(Void));
        assert!(!Void.can_transition_to(Void));
    }

    #[test]
    fn signing_requires_viewed() {
        use ContractStatus::*;
        assert!(Viewed.can_transition_to(Signed));
        assert!(!Sent.can_transition_to(Signed));
        assert!(!Draft.can_transition_to(Signed));
    }
}
