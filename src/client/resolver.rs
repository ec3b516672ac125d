//! Virtual conversation promotion
//!
//! A conversation started from a peer who has no server conversation yet lives
//! under a virtual id until the first send. Promotion turns it into the real
//! conversation exactly once per peer: concurrent callers share one in-flight
//! `create_or_fetch_conversation` call, and a failed call leaves nothing behind
//! so the next attempt retries.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::client::api::ChatApi;
use crate::client::state::{SharedState, SyncState};
use crate::shared::error::Result;
use crate::shared::messaging::{peer_from_virtual_id, Conversation};

pub struct VirtualConversationResolver {
    api: Arc<dyn ChatApi>,
    state: SharedState,
    pending: Mutex<HashMap<String, Arc<OnceCell<Conversation>>>>,
}

impl std::fmt::Debug for VirtualConversationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualConversationResolver")
            .finish_non_exhaustive()
    }
}

impl VirtualConversationResolver {
    pub fn new(api: Arc<dyn ChatApi>, state: SharedState) -> Self {
        Self {
            api,
            state,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `virtual_id` to its real conversation and promote it in the
    /// stores. Returns the conversation as stored after promotion.
    pub async fn resolve(&self, virtual_id: &str) -> Result<Conversation> {
        let peer_id = peer_from_virtual_id(virtual_id)?.to_string();

        {
            let mut state = self.state.write().await;
            if let Some(real) = state.conversations.find_real_by_peer(&peer_id).cloned() {
                tracing::debug!("[SYNC] {} already known as {}", virtual_id, real.id);
                return Ok(promote(&mut state, virtual_id, real));
            }
        }

        let cell = self
            .pending
            .lock()
            .await
            .entry(peer_id.clone())
            .or_default()
            .clone();

        let conversation = cell
            .get_or_try_init(|| async {
                tracing::info!("[SYNC] Promoting virtual conversation with {}", peer_id);
                self.api.create_or_fetch_conversation(&peer_id).await
            })
            .await
            .map_err(|e| {
                tracing::error!("[SYNC] Promotion of {} failed: {}", virtual_id, e);
                e
            })?
            .clone();

        let promoted = {
            let mut state = self.state.write().await;
            promote(&mut state, virtual_id, conversation)
        };

        // Promoted conversations are found through the store from now on.
        let mut pending = self.pending.lock().await;
        if pending
            .get(&peer_id)
            .is_some_and(|current| Arc::ptr_eq(current, &cell))
        {
            pending.remove(&peer_id);
        }
        Ok(promoted)
    }
}

fn promote(state: &mut SyncState, virtual_id: &str, real: Conversation) -> Conversation {
    let real_id = real.id.clone();
    state.conversations.promote(virtual_id, real.clone());
    state.messages.rebind(virtual_id, &real_id);
    state.conversations.get(&real_id).cloned().unwrap_or(real)
}
