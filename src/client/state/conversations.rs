//! Conversation Store
//!
//! Ordered conversation list with previews, unread counters and the active
//! selection. The list is kept sorted by `updated_at`, newest first, after
//! every mutation.

use crate::shared::messaging::{is_virtual_id, peer_from_virtual_id, Conversation, Message};

#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    loading: bool,
    preview_limit: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ConversationStore {
    pub fn new(preview_limit: usize) -> Self {
        Self {
            conversations: Vec::new(),
            active_id: None,
            loading: false,
            preview_limit: preview_limit.max(1),
        }
    }

    /// Conversations, newest activity first
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// The server-confirmed conversation with `peer_id`, if loaded
    pub fn find_real_by_peer(&self, peer_id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|c| !c.is_virtual && !peer_id.is_empty() && c.peer_id == peer_id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_id.as_deref() == Some(id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn total_unread(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Replace the list with a server page.
    ///
    /// Placeholders whose peer has no real conversation in the page survive,
    /// and so does the active conversation.
    pub(crate) fn replace_all(&mut self, conversations: Vec<Conversation>) {
        let previous = std::mem::take(&mut self.conversations);
        self.conversations = Vec::with_capacity(conversations.len());
        for mut conversation in conversations {
            conversation.is_virtual = false;
            conversation.preview_messages.truncate(self.preview_limit);
            if self.get(&conversation.id).is_none() {
                self.conversations.push(conversation);
            }
        }

        for kept in previous {
            if self.get(&kept.id).is_some() {
                continue;
            }
            let keep = if kept.is_virtual {
                self.find_real_by_peer(&kept.peer_id).is_none()
            } else {
                self.is_active(&kept.id)
            };
            if keep {
                self.conversations.push(kept);
            }
        }

        self.retarget_active_placeholder();
        self.sort();
    }

    /// Insert a conversation the caller holds a reference to, keeping any
    /// newer local copy.
    pub(crate) fn insert_if_absent(&mut self, conversation: Conversation) {
        if self.get(&conversation.id).is_some() {
            return;
        }
        self.insert(conversation);
    }

    /// Insert or refresh a conversation from the server (dedup by id).
    pub(crate) fn upsert(&mut self, conversation: Conversation) {
        let limit = self.preview_limit;
        match self.get_mut(&conversation.id) {
            Some(existing) => {
                existing.peer_id = conversation.peer_id;
                existing.is_virtual = conversation.is_virtual;
                existing.unread_count = conversation.unread_count;
                if conversation.updated_at > existing.updated_at {
                    existing.updated_at = conversation.updated_at;
                }
                if !conversation.preview_messages.is_empty() {
                    existing.preview_messages = conversation.preview_messages;
                    existing.preview_messages.truncate(limit);
                }
                let peer = (!existing.is_virtual).then(|| existing.peer_id.clone());
                if let Some(peer) = peer {
                    self.drop_placeholders_shadowed_by(&peer);
                }
                self.sort();
            }
            None => self.insert(conversation),
        }
    }

    fn insert(&mut self, mut conversation: Conversation) {
        conversation.preview_messages.truncate(self.preview_limit);
        if conversation.is_virtual {
            if let Some(real) = self.find_real_by_peer(&conversation.peer_id) {
                tracing::debug!(
                    "[SYNC] Placeholder {} shadowed by real conversation {}",
                    conversation.id,
                    real.id
                );
                return;
            }
        }
        let peer = (!conversation.is_virtual).then(|| conversation.peer_id.clone());
        self.conversations.push(conversation);
        if let Some(peer) = peer {
            self.drop_placeholders_shadowed_by(&peer);
        }
        self.sort();
    }

    /// Remove virtual placeholders for `peer_id` once a real conversation
    /// exists; an active placeholder hands the selection to the real one.
    fn drop_placeholders_shadowed_by(&mut self, peer_id: &str) {
        let Some(real_id) = self.find_real_by_peer(peer_id).map(|c| c.id.clone()) else {
            return;
        };
        let active = self.active_id.clone();
        self.conversations.retain(|c| {
            let shadowed = c.is_virtual && c.peer_id == peer_id;
            if shadowed {
                tracing::debug!("[SYNC] Discarding placeholder {} for {}", c.id, real_id);
            }
            !shadowed
        });
        if let Some(active) = active {
            if is_virtual_id(&active) && self.get(&active).is_none() {
                self.active_id = Some(real_id);
            }
        }
    }

    fn retarget_active_placeholder(&mut self) {
        let Some(active) = self.active_id.clone() else {
            return;
        };
        if self.get(&active).is_some() {
            return;
        }
        self.active_id = peer_from_virtual_id(&active)
            .ok()
            .and_then(|peer| self.find_real_by_peer(peer))
            .map(|real| real.id.clone());
    }

    /// Replace a placeholder by its server-confirmed conversation
    pub(crate) fn promote(&mut self, virtual_id: &str, mut real: Conversation) {
        real.is_virtual = false;
        let was_active = self.is_active(virtual_id);
        let placeholder = self
            .conversations
            .iter()
            .position(|c| c.id == virtual_id)
            .map(|pos| self.conversations.remove(pos));

        if let Some(placeholder) = placeholder {
            if real.updated_at < placeholder.updated_at {
                real.updated_at = placeholder.updated_at;
            }
        }
        let real_id = real.id.clone();
        self.upsert(real);
        if was_active {
            self.active_id = Some(real_id);
        }
    }

    pub(crate) fn set_active(&mut self, id: Option<&str>) {
        self.active_id = id.map(str::to_string);
    }

    pub(crate) fn clear_unread(&mut self, id: &str) {
        if let Some(conversation) = self.get_mut(id) {
            conversation.unread_count = 0;
        }
    }

    /// Fold a message into its conversation's preview and counters.
    ///
    /// Unknown conversations get a stub. Returns `true` when the message was
    /// new to the preview.
    pub(crate) fn apply_message(&mut self, conversation_id: &str, message: &Message, self_id: &str) -> bool {
        let active = self.is_active(conversation_id);
        let limit = self.preview_limit;
        if self.get(conversation_id).is_none() {
            let peer = if message.sender_id == self_id {
                String::new()
            } else {
                message.sender_id.clone()
            };
            tracing::debug!("[SYNC] Creating stub conversation {}", conversation_id);
            self.insert(Conversation::stub(conversation_id, peer, message.created_at));
        }
        let Some(conversation) = self.get_mut(conversation_id) else {
            return false;
        };

        let is_new = conversation.record_message(message, limit);
        if message.sender_id == self_id || active {
            conversation.unread_count = 0;
        } else if is_new {
            conversation.unread_count = conversation.unread_count.saturating_add(1);
        }
        self.sort();
        is_new
    }

    /// Drop a rolled-back optimistic message from its preview
    pub(crate) fn discard_optimistic(&mut self, conversation_id: &str, client_ref: &str) {
        if let Some(conversation) = self.get_mut(conversation_id) {
            conversation
                .preview_messages
                .retain(|m| !(m.is_optimistic() && m.client_ref.as_deref() == Some(client_ref)));
        }
    }

    /// Read acknowledgment from `reader_id`
    pub(crate) fn apply_read(&mut self, conversation_id: &str, reader_id: &str) {
        if let Some(conversation) = self.get_mut(conversation_id) {
            conversation.mark_read_by(reader_id);
            conversation.unread_count = 0;
        }
    }

    fn sort(&mut self) {
        // Stable: equal timestamps keep their relative order.
        self.conversations
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}
