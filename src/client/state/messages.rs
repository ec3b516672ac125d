//! Message Store
//!
//! Message list of the active conversation, optimistic entries included, and
//! the bookkeeping for in-flight fetches.

use std::collections::HashSet;

use crate::shared::messaging::{Message, MessagePage};

/// What reconciliation did with an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Replaced an optimistic entry in place
    Replaced,
    /// Appended to the active list
    Appended,
    /// Already present
    Duplicate,
    /// Belongs to an inactive conversation
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    has_more: bool,
    next_page: u32,
    in_flight: HashSet<String>,
    /// Server ids that already took the place of an optimistic entry
    confirmed: HashSet<String>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation whose messages are loaded
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether the current conversation has a fetch in flight
    pub fn is_loading(&self) -> bool {
        self.conversation_id
            .as_ref()
            .is_some_and(|id| self.in_flight.contains(id))
    }

    /// Whether older pages remain on the server
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub(crate) fn next_page(&self) -> u32 {
        self.next_page
    }

    /// Point the store at another conversation. Returns `false` (and keeps the
    /// list) if it already shows `id`.
    pub(crate) fn switch_to(&mut self, id: Option<&str>) -> bool {
        if self.conversation_id.as_deref() == id {
            return false;
        }
        self.conversation_id = id.map(str::to_string);
        self.messages.clear();
        self.confirmed.clear();
        self.has_more = false;
        self.next_page = 1;
        true
    }

    /// Mark a fetch for `id` as started. Returns `false` if one is already in
    /// flight.
    pub(crate) fn begin_fetch(&mut self, id: &str) -> bool {
        self.in_flight.insert(id.to_string())
    }

    pub(crate) fn end_fetch(&mut self, id: &str) {
        self.in_flight.remove(id);
    }

    pub(crate) fn push_optimistic(&mut self, message: Message) {
        if self.conversation_id.as_deref() == Some(message.conversation_id.as_str()) {
            self.messages.push(message);
        }
    }

    /// Drop an optimistic entry whose send never left the client
    pub(crate) fn rollback(&mut self, client_ref: &str) {
        self.messages
            .retain(|m| !(m.is_optimistic() && m.client_ref.as_deref() == Some(client_ref)));
    }

    /// Match an inbound message against local state.
    ///
    /// Correlation ids are authoritative. Confirmations without one fall back to
    /// the oldest optimistic entry from the same sender with the same content.
    pub(crate) fn reconcile(&mut self, message: &Message) -> Reconciled {
        let matched = self.confirmed_optimistic(message);

        if self.messages.iter().any(|m| m.id == message.id) {
            // A fetch already delivered the persisted copy. A replayed
            // confirmation must not consume another pending send.
            if let Some(pos) = matched {
                if self.confirmed.insert(message.id.clone()) {
                    self.messages.remove(pos);
                }
            }
            return Reconciled::Duplicate;
        }

        if let Some(pos) = matched {
            self.confirmed.insert(message.id.clone());
            self.messages[pos] = message.clone();
            return Reconciled::Replaced;
        }

        if self.conversation_id.as_deref() == Some(message.conversation_id.as_str()) {
            self.messages.push(message.clone());
            return Reconciled::Appended;
        }
        Reconciled::Ignored
    }

    fn confirmed_optimistic(&self, message: &Message) -> Option<usize> {
        match &message.client_ref {
            Some(client_ref) => self
                .messages
                .iter()
                .position(|m| m.is_optimistic() && m.client_ref.as_ref() == Some(client_ref)),
            None => self.messages.iter().position(|m| {
                m.conversation_id == message.conversation_id && message.loosely_confirms(m)
            }),
        }
    }

    /// Apply the first page of a fetch for `id`. Stale responses (the active
    /// conversation changed meanwhile) are rejected with `false`.
    ///
    /// Messages that reached the list while the fetch was in flight are kept
    /// after the fetched ones, unless the page already contains them.
    pub(crate) fn apply_page(&mut self, id: &str, page: MessagePage) -> bool {
        if self.conversation_id.as_deref() != Some(id) {
            return false;
        }
        let fetched_ids: HashSet<&str> = page.messages.iter().map(|m| m.id.as_str()).collect();
        let fetched_refs: HashSet<&str> = page
            .messages
            .iter()
            .filter_map(|m| m.client_ref.as_deref())
            .collect();

        let arrived: Vec<Message> = std::mem::take(&mut self.messages)
            .into_iter()
            .filter(|m| !fetched_ids.contains(m.id.as_str()))
            .filter(|m| {
                !(m.is_optimistic()
                    && m.client_ref
                        .as_deref()
                        .is_some_and(|r| fetched_refs.contains(r)))
            })
            .collect();

        self.has_more = page.has_more;
        self.next_page = page.page.saturating_add(1);
        self.messages = page.messages;
        self.messages.extend(arrived);
        true
    }

    /// Prepend an older page for `id`; duplicates are skipped.
    pub(crate) fn prepend_older(&mut self, id: &str, page: MessagePage) -> bool {
        if self.conversation_id.as_deref() != Some(id) {
            return false;
        }
        let known: HashSet<String> = self.messages.iter().map(|m| m.id.clone()).collect();
        let mut older: Vec<Message> = page
            .messages
            .into_iter()
            .filter(|m| !known.contains(&m.id))
            .collect();
        older.append(&mut self.messages);
        self.messages = older;
        self.has_more = page.has_more;
        self.next_page = page.page.saturating_add(1);
        true
    }

    /// Rebind the list from a promoted placeholder to its real conversation
    pub(crate) fn rebind(&mut self, from: &str, to: &str) {
        if self.conversation_id.as_deref() != Some(from) {
            return;
        }
        self.conversation_id = Some(to.to_string());
        for message in &mut self.messages {
            message.conversation_id = to.to_string();
        }
    }

    /// Read acknowledgment from `reader_id` in `conversation_id`
    pub(crate) fn mark_read_by(&mut self, conversation_id: &str, reader_id: &str) {
        if self.conversation_id.as_deref() != Some(conversation_id) {
            return;
        }
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.sender_id != reader_id)
        {
            message.is_read = true;
        }
    }
}
