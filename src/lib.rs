//! xfchat - Realtime Conversation Synchronization
//!
//! Client-side engine that keeps a local view of a user's one-to-one
//! conversations in sync with a chat server: the conversation list with
//! previews and unread counters, the message list of the open conversation,
//! and sends that show up immediately and are reconciled once the server
//! confirms them.
//!
//! # Module Structure
//!
//! - **`shared`** - Types exchanged with the server
//!   - Conversations, messages, attachments
//!   - Realtime event envelopes
//!   - Error and configuration types
//!
//! - **`client`** - The engine
//!   - [`client::ChatSession`], built at login and dropped at logout
//!   - Realtime connection with bounded reconnection
//!   - Conversation and message stores, virtual conversation promotion
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use xfchat::client::{ChatSession, Config, Credentials, HttpChatApi, SseTransport};
//!
//! # async fn example() -> xfchat::shared::Result<()> {
//! let mut config = Config::from_env(None)?;
//! config.set_token(Some("token".to_string()));
//! let session = ChatSession::login(
//!     config.app(),
//!     "alice",
//!     Credentials::bearer("token"),
//!     Arc::new(HttpChatApi::new(config.clone())),
//!     Arc::new(SseTransport::new(config.clone())),
//! )
//! .await;
//! session.fetch_all(1, 20).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Session state lives in one `Arc<RwLock<SyncState>>`. Inbound events are
//! applied by a single dispatcher task in arrival order; the lock is never
//! held across a network call.

/// Shared types and data structures
pub mod shared;

/// Synchronization engine
pub mod client;
