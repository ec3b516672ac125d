//! Conversation Data Structure
//!
//! Represents a one-to-one conversation with a peer. A conversation is either
//! server-confirmed ("real") or a local placeholder ("virtual") whose id encodes
//! the peer it was opened for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::shared::error::SyncError;

/// Prefix reserved for virtual conversation ids
pub const VIRTUAL_ID_PREFIX: &str = "virtual_";

/// Build the id of a virtual conversation: `virtual_<peer>_<millis>`
pub fn virtual_id(peer_id: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{}{}_{}",
        VIRTUAL_ID_PREFIX,
        peer_id,
        created_at.timestamp_millis()
    )
}

/// Whether `id` follows the virtual id pattern
pub fn is_virtual_id(id: &str) -> bool {
    id.starts_with(VIRTUAL_ID_PREFIX)
}

/// Recover the peer id embedded in a virtual conversation id.
///
/// Peer ids may themselves contain `_`, so only the trailing timestamp segment
/// is split off.
pub fn peer_from_virtual_id(id: &str) -> Result<&str, SyncError> {
    let invalid = || SyncError::InvalidVirtualId(id.to_string());
    let rest = id.strip_prefix(VIRTUAL_ID_PREFIX).ok_or_else(invalid)?;
    let (peer, ts) = rest.rsplit_once('_').ok_or_else(invalid)?;
    if peer.is_empty() || ts.is_empty() || !ts.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    Ok(peer)
}

/// Represents a conversation with a peer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Server id, or a virtual id for local placeholders
    pub id: String,
    /// The other party
    pub peer_id: String,
    /// Most recent messages, newest first
    #[serde(default)]
    pub preview_messages: Vec<Message>,
    /// Number of unread messages
    #[serde(default)]
    pub unread_count: u32,
    /// Timestamp of the latest activity
    pub updated_at: DateTime<Utc>,
    /// Local placeholder without a server record
    #[serde(default)]
    pub is_virtual: bool,
}

impl Conversation {
    /// Create a placeholder for a peer that has no server-side conversation yet
    pub fn new_virtual(peer_id: impl Into<String>) -> Self {
        let peer_id = peer_id.into();
        let now = Utc::now();
        Self {
            id: virtual_id(&peer_id, now),
            peer_id,
            preview_messages: Vec::new(),
            unread_count: 0,
            updated_at: now,
            is_virtual: true,
        }
    }

    /// Minimal conversation built from an inbound event for an unknown id
    pub fn stub(id: impl Into<String>, peer_id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            peer_id: peer_id.into(),
            preview_messages: Vec::new(),
            unread_count: 0,
            updated_at,
            is_virtual: false,
        }
    }

    /// Latest message, if any preview is loaded
    pub fn last_message(&self) -> Option<&Message> {
        self.preview_messages.first()
    }

    /// Fold a message into the preview. Returns `true` when the message was not
    /// previously known (neither by id nor as a confirmed optimistic entry).
    pub(crate) fn record_message(&mut self, message: &Message, preview_limit: usize) -> bool {
        if self.preview_messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        let confirms = match &message.client_ref {
            Some(client_ref) => self
                .preview_messages
                .iter()
                .position(|m| m.is_optimistic() && m.client_ref.as_ref() == Some(client_ref)),
            // Newest first, so the oldest candidate is the last one.
            None => self
                .preview_messages
                .iter()
                .rposition(|m| message.loosely_confirms(m)),
        };
        let is_new = match confirms {
            Some(pos) => {
                self.preview_messages[pos] = message.clone();
                false
            }
            None => {
                self.preview_messages.insert(0, message.clone());
                self.preview_messages.truncate(preview_limit);
                true
            }
        };
        // Never move backwards on late or replayed deliveries.
        if message.created_at > self.updated_at {
            self.updated_at = message.created_at;
        }
        is_new
    }

    /// Mark every preview message not sent by `reader_id` as read
    pub(crate) fn mark_read_by(&mut self, reader_id: &str) {
        for message in self
            .preview_messages
            .iter_mut()
            .filter(|m| m.sender_id != reader_id)
        {
            message.is_read = true;
        }
    }
}

/// Page of conversations returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    pub conversations: Vec<Conversation>,
    pub page: u32,
    pub limit: u32,
    #[serde(default)]
    pub has_more: bool,
}

/// Request to create (or fetch) the conversation with a peer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub peer_id: String,
}

/// Response carrying a single conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEnvelope {
    pub conversation: Conversation,
}
