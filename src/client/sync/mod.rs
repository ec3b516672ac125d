//! # Sync Engine
//!
//! Single dispatcher for everything the realtime channel delivers. The
//! connection manager pushes [`InboundEvent`]s into one `mpsc` channel; the
//! engine consumes it on one task, so events are applied strictly in arrival
//! order.
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Connected` | re-join the active conversation's room |
//! | `Disconnected` / `ConnectError` | logged; caches kept |
//! | `NewMessage` | reconcile into the message list, fold into the preview |
//! | `ConversationUpdated` | fold into the preview |
//! | `MessagesRead` | mark read, zero unread |
//!
//! Every handled event bumps the change revision observed by the UI.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::connection::ConnectionManager;
use crate::client::state::{Reconciled, SharedState};
use crate::shared::event::{InboundEvent, OutboundEvent};
use crate::shared::messaging::{is_virtual_id, Message};

#[derive(Debug, Clone)]
pub struct SyncEngine {
    state: SharedState,
    connection: Arc<ConnectionManager>,
    changes: Arc<watch::Sender<u64>>,
}

impl SyncEngine {
    pub fn new(
        state: SharedState,
        connection: Arc<ConnectionManager>,
        changes: Arc<watch::Sender<u64>>,
    ) -> Self {
        Self {
            state,
            connection,
            changes,
        }
    }

    /// Run the dispatcher on its own task
    pub fn spawn(self, events: mpsc::Receiver<InboundEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    /// Consume events until every sender is gone
    pub async fn run(self, mut events: mpsc::Receiver<InboundEvent>) {
        tracing::debug!("[SYNC] Dispatcher started");
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        tracing::debug!("[SYNC] Dispatcher stopped");
    }

    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Connected => self.rejoin_active().await,
            InboundEvent::Disconnected { reason } => {
                tracing::warn!("[SYNC] Realtime channel lost: {}", reason);
            }
            InboundEvent::ConnectError { reason } => {
                tracing::warn!("[SYNC] Realtime connect error: {}", reason);
            }
            InboundEvent::NewMessage(message) => self.on_new_message(message).await,
            InboundEvent::ConversationUpdated {
                conversation_id,
                last_message,
            } => {
                let mut state = self.state.write().await;
                let user_id = state.user_id.clone();
                state
                    .conversations
                    .apply_message(&conversation_id, &last_message, &user_id);
            }
            InboundEvent::MessagesRead {
                conversation_id,
                reader_id,
            } => {
                tracing::debug!(conversation = %conversation_id, reader = %reader_id, "[SYNC] messagesRead");
                let mut state = self.state.write().await;
                state.messages.mark_read_by(&conversation_id, &reader_id);
                state.conversations.apply_read(&conversation_id, &reader_id);
            }
        }
        self.changes.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    async fn on_new_message(&self, message: Message) {
        let mut state = self.state.write().await;
        let user_id = state.user_id.clone();
        let outcome = state.messages.reconcile(&message);
        let is_new = state
            .conversations
            .apply_message(&message.conversation_id, &message, &user_id);
        tracing::debug!(
            message = %message.id,
            conversation = %message.conversation_id,
            ?outcome,
            is_new,
            "[SYNC] newMessage"
        );
        if outcome == Reconciled::Replaced {
            tracing::info!("[SYNC] Confirmed {}", message.id);
        }
    }

    /// Room membership does not survive a reconnect.
    async fn rejoin_active(&self) {
        let active = self
            .state
            .read()
            .await
            .conversations
            .active_id()
            .filter(|id| !is_virtual_id(id))
            .map(str::to_string);
        let Some(conversation_id) = active else {
            return;
        };
        tracing::info!("[SYNC] Re-joining {}", conversation_id);
        // A failed emit was already logged by the connection manager.
        let _ = self
            .connection
            .emit(OutboundEvent::JoinConversation { conversation_id })
            .await;
    }
}
