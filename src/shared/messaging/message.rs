//! Chat Message Data Structure
//!
//! Represents a message in a conversation, including optimistic (not yet
//! confirmed) messages created locally while a send is in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix reserved for optimistic message ids
pub const TEMP_ID_PREFIX: &str = "temp_";

/// File attached to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Attachment {
    /// Self-contained payload for a send still in flight
    #[serde(rename_all = "camelCase")]
    Inline {
        file_name: String,
        mime_type: String,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    /// Server-hosted file once the send is confirmed
    #[serde(rename_all = "camelCase")]
    Reference {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl Attachment {
    pub fn inline(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Attachment::Inline {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Attachment::Inline { .. })
    }
}

/// Represents a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server id, or `temp_<client_ref>` while optimistic
    pub id: String,
    /// Conversation this message belongs to
    pub conversation_id: String,
    /// User who sent the message
    pub sender_id: String,
    /// Text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Inline payload or server reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// Whether the recipient has read the message
    #[serde(default)]
    pub is_read: bool,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Client correlation id, echoed back by the server on confirmation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
}

impl Message {
    /// Create an optimistic message for an outgoing send
    pub fn optimistic(
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> Self {
        let client_ref = Uuid::new_v4().to_string();
        Self {
            id: format!("{}{}", TEMP_ID_PREFIX, client_ref),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            content,
            attachment,
            is_read: false,
            created_at: Utc::now(),
            client_ref: Some(client_ref),
        }
    }

    /// Whether this is a local optimistic entry awaiting confirmation
    pub fn is_optimistic(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Get a preview of the message (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        let text = match (&self.content, &self.attachment) {
            (Some(content), _) => content.as_str(),
            (None, Some(_)) => "[attachment]",
            (None, None) => "",
        };
        if text.chars().count() <= max_len {
            text.to_string()
        } else {
            let mut preview: String = text.chars().take(max_len.saturating_sub(3)).collect();
            preview.push_str("...");
            preview
        }
    }

    /// Content-based match between an optimistic entry and a confirmation that
    /// carries no correlation id.
    pub(crate) fn loosely_confirms(&self, optimistic: &Message) -> bool {
        if !optimistic.is_optimistic() || optimistic.sender_id != self.sender_id {
            return false;
        }
        if optimistic.content != self.content {
            return false;
        }
        match &self.attachment {
            Some(_) => optimistic
                .attachment
                .as_ref()
                .map(Attachment::is_inline)
                .unwrap_or(false),
            None => optimistic.attachment.is_none(),
        }
    }
}

/// Page of messages returned by the API, oldest first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub page: u32,
    pub limit: u32,
    #[serde(default)]
    pub has_more: bool,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
