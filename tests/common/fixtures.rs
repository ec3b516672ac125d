//! Fixture builders and session setup

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use xfchat::client::{ChatSession, Credentials};
use xfchat::shared::{AppConfig, Conversation, Message};

use super::{FakeApi, FakeTransport};

pub const ME: &str = "me";

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn conversation(id: &str, peer: &str, secs: i64) -> Conversation {
    Conversation::stub(id, peer, at(secs))
}

pub fn message(id: &str, conversation: &str, sender: &str, content: &str, secs: i64) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation.to_string(),
        sender_id: sender.to_string(),
        content: Some(content.to_string()),
        attachment: None,
        is_read: false,
        created_at: at(secs),
        client_ref: None,
    }
}

/// Server copy of an optimistic message, echoing its correlation id
pub fn confirmation(optimistic: &Message, id: &str) -> Message {
    Message {
        id: id.to_string(),
        created_at: Utc::now(),
        ..optimistic.clone()
    }
}

/// Fast reconnects so tests never wait on backoff
pub fn test_config() -> AppConfig {
    AppConfig::builder()
        .max_reconnect_attempts(2)
        .reconnect_delays(Duration::from_millis(1), Duration::from_millis(5))
        .build()
        .unwrap()
}

/// Log in as [`ME`] without waiting for the realtime channel
pub async fn login(api: &Arc<FakeApi>, transport: &Arc<FakeTransport>) -> ChatSession {
    ChatSession::login(
        &test_config(),
        ME,
        Credentials::bearer("token"),
        api.clone(),
        transport.clone(),
    )
    .await
}

/// Log in as [`ME`] and wait until the realtime channel is up
pub async fn connected_session(api: &Arc<FakeApi>, transport: &Arc<FakeTransport>) -> ChatSession {
    let session = login(api, transport).await;
    let mut status = session.connection().subscribe_status();
    tokio::time::timeout(Duration::from_secs(2), status.wait_for(|s| s.is_connected()))
        .await
        .expect("realtime channel never connected")
        .expect("status channel closed");
    session
}
