//! Messaging Module
//!
//! Data structures exchanged with the chat server:
//!
//! - `Message` - A message in a conversation (optimistic or confirmed)
//! - `Attachment` - Inline payload or server reference
//! - `Conversation` - A one-to-one conversation, real or virtual
//!
//! # Usage
//!
//! ```rust
//! use xfchat::shared::messaging::{Conversation, Message};
//!
//! let placeholder = Conversation::new_virtual("alice");
//! let draft = Message::optimistic(&placeholder.id, "me", Some("hi".into()), None);
//! assert!(draft.is_optimistic());
//! ```

pub mod conversation;
pub mod message;

pub use conversation::{
    is_virtual_id, peer_from_virtual_id, virtual_id, Conversation, ConversationEnvelope,
    ConversationPage, CreateConversationRequest, VIRTUAL_ID_PREFIX,
};
pub use message::{Attachment, Message, MessagePage, TEMP_ID_PREFIX};
