//! In-memory chat server REST surface

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use xfchat::client::ChatApi;
use xfchat::shared::messaging::{ConversationPage, MessagePage};
use xfchat::shared::{Conversation, Message, Result, SyncError};

#[derive(Default)]
struct ServerData {
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
    gates: HashMap<String, Arc<Notify>>,
    fail_listing: bool,
    failing_creates: u32,
    create_delay: Duration,
    next_id: u32,
    message_fetches: Vec<(String, u32)>,
}

/// Fake [`ChatApi`] with call counters and per-conversation fetch gates
#[derive(Default)]
pub struct FakeApi {
    data: Mutex<ServerData>,
    pub listings: AtomicUsize,
    pub creates: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_conversations(conversations: Vec<Conversation>) -> Arc<Self> {
        let api = Self::default();
        api.data.lock().unwrap().conversations = conversations;
        Arc::new(api)
    }

    pub fn set_messages(&self, conversation_id: &str, messages: Vec<Message>) {
        self.data
            .lock()
            .unwrap()
            .messages
            .insert(conversation_id.to_string(), messages);
    }

    /// Hold message fetches for `conversation_id` until the returned gate is
    /// notified
    pub fn hold_messages(&self, conversation_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.data
            .lock()
            .unwrap()
            .gates
            .insert(conversation_id.to_string(), gate.clone());
        gate
    }

    pub fn fail_listing(&self, fail: bool) {
        self.data.lock().unwrap().fail_listing = fail;
    }

    pub fn fail_next_creates(&self, count: u32) {
        self.data.lock().unwrap().failing_creates = count;
    }

    pub fn set_create_delay(&self, delay: Duration) {
        self.data.lock().unwrap().create_delay = delay;
    }

    /// `(conversation_id, page)` of every message fetch, in call order
    pub fn message_fetches(&self) -> Vec<(String, u32)> {
        self.data.lock().unwrap().message_fetches.clone()
    }

    pub fn fetches_for(&self, conversation_id: &str) -> usize {
        self.message_fetches()
            .iter()
            .filter(|(id, _)| id == conversation_id)
            .count()
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn fetch_conversations(&self, page: u32, limit: u32) -> Result<ConversationPage> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let data = self.data.lock().unwrap();
        if data.fail_listing {
            return Err(SyncError::api(503, "unavailable"));
        }
        Ok(ConversationPage {
            conversations: data.conversations.clone(),
            page,
            limit,
            has_more: false,
        })
    }

    async fn create_or_fetch_conversation(&self, peer_id: &str) -> Result<Conversation> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let delay = self.data.lock().unwrap().create_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut data = self.data.lock().unwrap();
        if data.failing_creates > 0 {
            data.failing_creates -= 1;
            return Err(SyncError::network("connection reset"));
        }
        if let Some(existing) = data.conversations.iter().find(|c| c.peer_id == peer_id) {
            return Ok(existing.clone());
        }
        data.next_id += 1;
        let created = Conversation::stub(format!("c{}", data.next_id), peer_id, Utc::now());
        data.conversations.push(created.clone());
        Ok(created)
    }

    async fn fetch_messages(&self, conversation_id: &str, page: u32, limit: u32) -> Result<MessagePage> {
        let gate = {
            let mut data = self.data.lock().unwrap();
            data.message_fetches.push((conversation_id.to_string(), page));
            data.gates.get(conversation_id).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let all = self
            .data
            .lock()
            .unwrap()
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();
        // Page 1 is the newest slice; each page is oldest first.
        let size = limit.max(1) as usize;
        let end = all.len().saturating_sub(page.saturating_sub(1) as usize * size);
        let start = end.saturating_sub(size);
        Ok(MessagePage {
            messages: all[start..end].to_vec(),
            page,
            limit,
            has_more: start > 0,
        })
    }
}
