use academy_core::ServiceError;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::{label_enum, Entity, FieldDef, FieldKind, Label};

label_enum! {
    /// Delivery state, advanced by the SMS gateway.
    pub enum SmsStatus {
        Pending = "pending",
        Sent = "sent",
        Failed = "failed",
    }
    default Pending
}

/// One outbound text message, queued for the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsMessage {
    pub recipient_phone: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    #[serde(default)]
    pub status: SmsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
}

/// Longest message accepted, in characters (ten concatenated segments).
pub const MAX_MESSAGE_CHARS: usize = 1600;

impl Entity for SmsMessage {
    const COLLECTION: Collection = Collection::SmsMessages;
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::required("recipientPhone", FieldKind::Text),
        FieldDef::required("message", FieldKind::Text),
        FieldDef::optional("recipientName", FieldKind::Text),
        FieldDef::optional("familyId", FieldKind::Text),
        FieldDef::optional("status", FieldKind::Choice(SmsStatus::NAMES)),
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["recipientName", "recipientPhone", "message"];
    const FILTER_FIELDS: &'static [&'static str] = &["status"];

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn partition(&self) -> &'static str {
        self.status.as_str()
    }

    fn display_name(&self) -> &str {
        self.recipient_name.as_deref().unwrap_or(&self.recipient_phone)
    }

    fn check(&self) -> Result<(), ServiceError> {
        let len = self.message.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ServiceError::Validation(format!(
                "message is {len} characters, limit is {MAX_MESSAGE_CHARS}"
            )));
        }
        Ok(())
    }
}

/// Fill `{name}` placeholders in a message template.
pub fn render_template(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}
