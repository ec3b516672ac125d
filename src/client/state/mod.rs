//! Session state shared by the dispatcher and UI-facing operations.

pub mod conversations;
pub mod messages;

pub use conversations::ConversationStore;
pub use messages::{MessageStore, Reconciled};

use std::sync::Arc;
use tokio::sync::RwLock;

/// Both stores plus the logged-in user
#[derive(Debug, Clone)]
pub struct SyncState {
    pub user_id: String,
    pub conversations: ConversationStore,
    pub messages: MessageStore,
}

impl SyncState {
    pub fn new(user_id: impl Into<String>, preview_limit: usize) -> Self {
        Self {
            user_id: user_id.into(),
            conversations: ConversationStore::new(preview_limit),
            messages: MessageStore::new(),
        }
    }
}

pub type SharedState = Arc<RwLock<SyncState>>;
