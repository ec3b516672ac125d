//! Client Module
//!
//! The synchronization engine as seen from one logged-in user.
//!
//! - [`api`] - REST calls behind the [`ChatApi`] seam
//! - [`connection`] - realtime channel, reconnection, SSE transport
//! - [`state`] - conversation and message stores
//! - [`resolver`] - virtual conversation promotion
//! - [`sync`] - inbound event dispatcher
//! - [`session`] - [`ChatSession`], the entry point for UI code

pub mod api;
pub mod config;
pub mod connection;
pub mod resolver;
pub mod session;
pub mod state;
pub mod sync;

pub use api::{ChatApi, HttpChatApi};
pub use config::Config;
pub use connection::{
    ConnectionManager, ConnectionStatus, Credentials, RealtimeTransport, ReconnectPolicy,
    SseTransport,
};
pub use resolver::VirtualConversationResolver;
pub use session::ChatSession;
pub use state::{ConversationStore, MessageStore, SharedState, SyncState};
pub use sync::SyncEngine;
