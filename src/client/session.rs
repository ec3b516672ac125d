//! # Chat Session
//!
//! Everything the sync layer holds for one logged-in user. A session is built
//! by [`ChatSession::login`] and torn down by [`ChatSession::logout`]; nothing
//! outlives it and there is no process-wide instance.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xfchat::client::{ChatSession, Config, Credentials, HttpChatApi, SseTransport};
//!
//! # async fn run() -> xfchat::shared::Result<()> {
//! let mut config = Config::from_env(None)?;
//! config.set_token(Some("token".to_string()));
//!
//! let session = ChatSession::login(
//!     config.app(),
//!     "alice",
//!     Credentials::bearer("token"),
//!     Arc::new(HttpChatApi::new(config.clone())),
//!     Arc::new(SseTransport::new(config.clone())),
//! )
//! .await;
//!
//! session.fetch_all(1, 20).await?;
//! let conversation = session.start_conversation("bob").await?;
//! session.send_message(&conversation.id, Some("hi".into()), None).await?;
//! session.logout().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::client::api::ChatApi;
use crate::client::connection::{ConnectionManager, Credentials, RealtimeTransport, ReconnectPolicy};
use crate::client::resolver::VirtualConversationResolver;
use crate::client::state::{SharedState, SyncState};
use crate::client::sync::SyncEngine;
use crate::shared::config::AppConfig;
use crate::shared::error::Result;
use crate::shared::event::OutboundEvent;
use crate::shared::messaging::{is_virtual_id, peer_from_virtual_id, Attachment, Conversation, Message};

/// Capacity of the inbound event channel
const EVENT_BUFFER: usize = 256;

/// UI-facing handle of a logged-in session. Cheap to clone.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    user_id: String,
    message_page_size: u32,
    api: Arc<dyn ChatApi>,
    state: SharedState,
    connection: Arc<ConnectionManager>,
    resolver: VirtualConversationResolver,
    changes: Arc<watch::Sender<u64>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("user_id", &self.inner.user_id)
            .field("connection", &self.inner.connection)
            .finish_non_exhaustive()
    }
}

/// Outcome of activating a real conversation
struct Activation {
    conversation: Conversation,
    join: bool,
    fetch: bool,
}

impl ChatSession {
    /// Build the session, start its dispatcher and open the realtime channel.
    pub async fn login(
        config: &AppConfig,
        user_id: impl Into<String>,
        credentials: Credentials,
        api: Arc<dyn ChatApi>,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Self {
        let user_id = user_id.into();
        tracing::info!("[SYNC] Starting session for {}", user_id);

        let state: SharedState = Arc::new(RwLock::new(SyncState::new(
            user_id.clone(),
            config.preview_limit,
        )));
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let connection = Arc::new(ConnectionManager::new(
            transport,
            ReconnectPolicy::from(config.reconnect.clone()),
            events_tx,
        ));
        let (changes, _) = watch::channel(0u64);
        let changes = Arc::new(changes);

        let dispatcher = SyncEngine::new(state.clone(), connection.clone(), changes.clone())
            .spawn(events_rx);

        let session = Self {
            inner: Arc::new(SessionInner {
                user_id: user_id.clone(),
                message_page_size: config.message_page_size,
                resolver: VirtualConversationResolver::new(api.clone(), state.clone()),
                api,
                state,
                connection,
                changes,
                dispatcher: Mutex::new(Some(dispatcher)),
            }),
        };
        session.inner.connection.connect(credentials, user_id).await;
        session
    }

    /// Close the realtime channel and stop the dispatcher
    pub async fn logout(&self) {
        self.inner.connection.disconnect().await;
        if let Some(handle) = self.inner.dispatcher.lock().await.take() {
            handle.abort();
        }
        tracing::info!("[SYNC] Session for {} closed", self.inner.user_id);
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn state(&self) -> SharedState {
        self.inner.state.clone()
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.inner.connection
    }

    /// Revision counter bumped after every state change
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Snapshot of the conversation list, newest activity first
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.inner.state.read().await.conversations.conversations().to_vec()
    }

    pub async fn active_conversation(&self) -> Option<Conversation> {
        self.inner.state.read().await.conversations.active().cloned()
    }

    /// Snapshot of the active conversation's messages, oldest first
    pub async fn messages(&self) -> Vec<Message> {
        self.inner.state.read().await.messages.messages().to_vec()
    }

    pub async fn total_unread(&self) -> u32 {
        self.inner.state.read().await.conversations.total_unread()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.state.read().await.conversations.is_loading()
    }

    fn notify(&self) {
        self.inner
            .changes
            .send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Replace the conversation list with a server page. On failure the list
    /// is left as it was.
    pub async fn fetch_all(&self, page: u32, limit: u32) -> Result<()> {
        self.inner.state.write().await.conversations.set_loading(true);
        self.notify();

        let result = self.inner.api.fetch_conversations(page, limit).await;

        let adopted = {
            let mut state = self.inner.state.write().await;
            state.conversations.set_loading(false);
            match result {
                Ok(fetched) => {
                    tracing::info!(
                        "[SYNC] Loaded {} conversations (page {})",
                        fetched.conversations.len(),
                        page
                    );
                    let active_before = state.conversations.active_id().map(str::to_string);
                    state.conversations.replace_all(fetched.conversations);
                    // An active placeholder may have been superseded by the page.
                    match (active_before, state.conversations.active().cloned()) {
                        (Some(before), Some(after)) if is_virtual_id(&before) && !after.is_virtual => {
                            Some(after)
                        }
                        _ => None,
                    }
                }
                Err(e) => {
                    tracing::error!("[SYNC] Failed to fetch conversations: {}", e);
                    drop(state);
                    self.notify();
                    return Err(e);
                }
            }
        };
        self.notify();

        if let Some(real) = adopted {
            let activation = self.activate_real(real, true).await;
            self.announce(&activation).await;
            if activation.fetch {
                self.spawn_load(activation.conversation.id);
            }
        }
        Ok(())
    }

    /// Open the canonical conversation with `peer_id` and make it active.
    pub async fn start_conversation(&self, peer_id: &str) -> Result<Conversation> {
        let conversation = self
            .inner
            .api
            .create_or_fetch_conversation(peer_id)
            .await
            .map_err(|e| {
                tracing::error!("[SYNC] Failed to start conversation with {}: {}", peer_id, e);
                e
            })?;

        self.inner
            .state
            .write()
            .await
            .conversations
            .upsert(conversation.clone());

        let activation = self.activate_real(conversation, true).await;
        self.notify();
        self.announce(&activation).await;
        if activation.fetch {
            let _ = self.load_messages(&activation.conversation.id).await;
        }
        Ok(activation.conversation)
    }

    /// Make `conversation` the active one.
    ///
    /// A virtual conversation whose peer already has a real conversation is
    /// swapped for the real one. Remaining placeholders are only listed: no
    /// fetch, no join. Real conversations are joined, read-acknowledged and
    /// have their messages fetched unless they were already showing.
    pub async fn set_active(&self, conversation: Conversation, is_virtual: bool) -> Conversation {
        let target = if is_virtual || conversation.is_virtual {
            let mut state = self.inner.state.write().await;
            let real = state
                .conversations
                .find_real_by_peer(&conversation.peer_id)
                .cloned();
            match real {
                Some(real) => {
                    tracing::debug!(
                        "[SYNC] Substituting {} for placeholder {}",
                        real.id,
                        conversation.id
                    );
                    real
                }
                None => {
                    let mut placeholder = conversation;
                    placeholder.is_virtual = true;
                    state.conversations.insert_if_absent(placeholder.clone());
                    state.conversations.set_active(Some(&placeholder.id));
                    state.messages.switch_to(Some(&placeholder.id));
                    drop(state);
                    self.notify();
                    return placeholder;
                }
            }
        } else {
            conversation
        };

        let activation = self.activate_real(target, false).await;
        self.notify();
        self.announce(&activation).await;
        if activation.fetch {
            let _ = self.load_messages(&activation.conversation.id).await;
        }
        activation.conversation
    }

    /// Send a message with optimistic insertion.
    ///
    /// Returns `Ok(None)` when the send was dropped because the realtime
    /// channel is down. A virtual conversation is promoted first; if that
    /// fails the error is returned and nothing is inserted.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Option<Message>> {
        if !self.inner.connection.is_connected() {
            tracing::warn!("[SYNC] Not connected, dropping message to {}", conversation_id);
            return Ok(None);
        }
        let content = content.filter(|text| !text.trim().is_empty());
        if content.is_none() && attachment.is_none() {
            tracing::debug!("[SYNC] Ignoring empty message to {}", conversation_id);
            return Ok(None);
        }

        let conversation_id = if is_virtual_id(conversation_id) {
            let real = self.inner.resolver.resolve(conversation_id).await?;
            let activation = self.activate_real(real, true).await;
            self.notify();
            self.announce(&activation).await;
            if activation.fetch {
                self.spawn_load(activation.conversation.id.clone());
            }
            activation.conversation.id
        } else {
            conversation_id.to_string()
        };

        let user_id = self.inner.user_id.clone();
        let optimistic = Message::optimistic(&conversation_id, &user_id, content, attachment);
        let client_ref = optimistic.client_ref.clone().unwrap_or_default();
        {
            let mut state = self.inner.state.write().await;
            state.messages.push_optimistic(optimistic.clone());
            state
                .conversations
                .apply_message(&conversation_id, &optimistic, &user_id);
        }
        self.notify();

        let event = OutboundEvent::SendMessage {
            conversation_id: conversation_id.clone(),
            sender_id: user_id,
            content: optimistic.content.clone(),
            attachment: optimistic.attachment.clone(),
            client_ref: client_ref.clone(),
        };
        if self.inner.connection.emit(event).await.is_err() {
            tracing::warn!("[SYNC] Send to {} dropped, rolling back {}", conversation_id, optimistic.id);
            let mut state = self.inner.state.write().await;
            state.messages.rollback(&client_ref);
            state
                .conversations
                .discard_optimistic(&conversation_id, &client_ref);
            drop(state);
            self.notify();
            return Ok(None);
        }

        tracing::debug!("[SYNC] Sent {} to {}", optimistic.id, conversation_id);
        Ok(Some(optimistic))
    }

    /// Prepend the next older page of the active conversation. Returns
    /// `false` when there was nothing to load.
    pub async fn load_older_messages(&self) -> Result<bool> {
        let (conversation_id, page) = {
            let mut state = self.inner.state.write().await;
            let Some(id) = state.messages.conversation_id().map(str::to_string) else {
                return Ok(false);
            };
            if is_virtual_id(&id) || !state.messages.has_more() || !state.messages.begin_fetch(&id) {
                return Ok(false);
            }
            (id, state.messages.next_page())
        };

        let result = self
            .inner
            .api
            .fetch_messages(&conversation_id, page, self.inner.message_page_size)
            .await;

        let mut state = self.inner.state.write().await;
        state.messages.end_fetch(&conversation_id);
        let applied = match result {
            Ok(older) => state.messages.prepend_older(&conversation_id, older),
            Err(e) => {
                tracing::error!("[SYNC] Failed to load older messages of {}: {}", conversation_id, e);
                return Err(e);
            }
        };
        drop(state);
        self.notify();
        Ok(applied)
    }

    async fn activate_real(&self, target: Conversation, refresh: bool) -> Activation {
        let mut state = self.inner.state.write().await;
        let already_active = state.conversations.is_active(&target.id);

        state.conversations.insert_if_absent(target.clone());
        state.conversations.set_active(Some(&target.id));
        state.conversations.clear_unread(&target.id);

        // Messages still bound to a superseded placeholder follow the promotion.
        let stale_placeholder = state
            .messages
            .conversation_id()
            .filter(|id| peer_from_virtual_id(id).is_ok_and(|peer| peer == target.peer_id))
            .map(str::to_string);
        if let Some(placeholder) = stale_placeholder {
            state.messages.rebind(&placeholder, &target.id);
        }

        let switched = state.messages.switch_to(Some(&target.id));
        let fetch = (switched || refresh) && state.messages.begin_fetch(&target.id);
        let conversation = state
            .conversations
            .get(&target.id)
            .cloned()
            .unwrap_or(target);

        Activation {
            conversation,
            join: refresh || !already_active,
            fetch,
        }
    }

    /// Emit the room join and read acknowledgment for an activation.
    /// Failures were already logged by the connection manager.
    async fn announce(&self, activation: &Activation) {
        let conversation_id = activation.conversation.id.clone();
        if activation.join {
            let _ = self
                .inner
                .connection
                .emit(OutboundEvent::JoinConversation {
                    conversation_id: conversation_id.clone(),
                })
                .await;
        }
        let _ = self
            .inner
            .connection
            .emit(OutboundEvent::MarkAsRead {
                conversation_id,
                user_id: self.inner.user_id.clone(),
            })
            .await;
    }

    fn spawn_load(&self, conversation_id: String) {
        let session = self.clone();
        tokio::spawn(async move {
            let _ = session.load_messages(&conversation_id).await;
        });
    }

    /// Fetch the first message page of `conversation_id`. The caller has
    /// already tagged the fetch as in flight; a response for a conversation
    /// that is no longer active is discarded.
    async fn load_messages(&self, conversation_id: &str) -> Result<()> {
        let result = self
            .inner
            .api
            .fetch_messages(conversation_id, 1, self.inner.message_page_size)
            .await;

        let mut state = self.inner.state.write().await;
        state.messages.end_fetch(conversation_id);
        match result {
            Ok(page) => {
                let count = page.messages.len();
                if state.messages.apply_page(conversation_id, page) {
                    tracing::debug!("[SYNC] Loaded {} messages for {}", count, conversation_id);
                } else {
                    tracing::debug!("[SYNC] Discarding stale messages for {}", conversation_id);
                }
                drop(state);
                self.notify();
                Ok(())
            }
            Err(e) => {
                tracing::error!("[SYNC] Failed to fetch messages for {}: {}", conversation_id, e);
                Err(e)
            }
        }
    }
}
