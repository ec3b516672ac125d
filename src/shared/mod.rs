//! Shared Module
//!
//! Types exchanged with the chat server: messages, conversations, realtime
//! events, plus the crate's error and configuration types. Everything here is
//! plain data and serializes to the server's camelCase JSON.

/// Shared error types
pub mod error;

/// Realtime event types
pub mod event;

/// Application configuration
pub mod config;

/// Conversation and message types
pub mod messaging;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::{Result, SyncError};
pub use event::{InboundEvent, OutboundEvent, ServerEvent};
pub use messaging::{Attachment, Conversation, Message};
