//! Real-time Event System
//!
//! Event types carried over the realtime channel.
//!
//! - [`ServerEvent`] - pushed by the server (`newMessage`, `conversationUpdated`,
//!   `messagesRead`)
//! - [`OutboundEvent`] - emitted by the client (`joinConversation`, `markAsRead`,
//!   `sendMessage`)
//! - [`InboundEvent`] - what the dispatcher consumes: every server event plus the
//!   connection lifecycle (`connect`, `disconnect`, `connect_error`)
//!
//! Server and outbound events share one wire envelope:
//!
//! ```json
//! { "event": "newMessage", "data": { "id": "m1", ... } }
//! ```
use serde::{Deserialize, Serialize};

use crate::shared::messaging::{Attachment, Message};

/// Event pushed by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// A message was persisted (ours or the peer's)
    NewMessage(Message),
    /// Conversation-level update carrying its newest message
    ConversationUpdated {
        conversation_id: String,
        last_message: Message,
    },
    /// `reader_id` has read the conversation
    MessagesRead {
        conversation_id: String,
        reader_id: String,
    },
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "newMessage",
            ServerEvent::ConversationUpdated { .. } => "conversationUpdated",
            ServerEvent::MessagesRead { .. } => "messagesRead",
        }
    }

    /// Decode an event from its name and JSON payload (SSE `event:` / `data:`)
    pub fn from_parts(name: &str, data: &str) -> Result<Self, serde_json::Error> {
        let data: serde_json::Value = serde_json::from_str(data)?;
        serde_json::from_value(serde_json::json!({ "event": name, "data": data }))
    }
}

/// Event emitted by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OutboundEvent {
    /// Subscribe to a conversation's room
    JoinConversation { conversation_id: String },
    /// Read acknowledgment for everything in the conversation
    MarkAsRead {
        conversation_id: String,
        user_id: String,
    },
    /// Persist and fan out a message
    SendMessage {
        conversation_id: String,
        sender_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attachment: Option<Attachment>,
        client_ref: String,
    },
}

impl OutboundEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::JoinConversation { .. } => "joinConversation",
            OutboundEvent::MarkAsRead { .. } => "markAsRead",
            OutboundEvent::SendMessage { .. } => "sendMessage",
        }
    }
}

/// Everything the sync dispatcher reacts to, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Realtime channel (re)established
    Connected,
    /// Realtime channel closed
    Disconnected { reason: String },
    /// Opening the realtime channel failed
    ConnectError { reason: String },
    NewMessage(Message),
    ConversationUpdated {
        conversation_id: String,
        last_message: Message,
    },
    MessagesRead {
        conversation_id: String,
        reader_id: String,
    },
}

impl From<ServerEvent> for InboundEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::NewMessage(message) => InboundEvent::NewMessage(message),
            ServerEvent::ConversationUpdated {
                conversation_id,
                last_message,
            } => InboundEvent::ConversationUpdated {
                conversation_id,
                last_message,
            },
            ServerEvent::MessagesRead {
                conversation_id,
                reader_id,
            } => InboundEvent::MessagesRead {
                conversation_id,
                reader_id,
            },
        }
    }
}
