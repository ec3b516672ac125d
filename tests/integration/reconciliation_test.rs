//! Optimistic sends and their confirmation

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use xfchat::shared::{Attachment, Conversation, OutboundEvent, ServerEvent};

use crate::common::*;

/// The `sendMessage` event emitted for `client_ref`
fn emitted_ref(transport: &FakeTransport) -> Vec<String> {
    transport
        .sent()
        .into_iter()
        .filter_map(|event| match event {
            OutboundEvent::SendMessage { client_ref, .. } => Some(client_ref),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_first_message_to_new_peer() {
    let api = FakeApi::new();
    let transport = FakeTransport::new();
    let session = connected_session(&api, &transport).await;

    let placeholder = Conversation::new_virtual("P");
    let active = session.set_active(placeholder.clone(), true).await;
    assert!(active.is_virtual);
    assert_eq!(api.message_fetches(), vec![]);
    assert!(transport.sent_named("joinConversation").is_empty());

    let optimistic = assert_ok!(session.send_message(&placeholder.id, Some("hi".into()), None).await)
        .expect("send was dropped");
    assert!(optimistic.is_optimistic());
    assert_eq!(optimistic.conversation_id, "c1");

    eventually!(emitted_ref(&transport) == vec![optimistic.client_ref.clone().unwrap()]);
    transport
        .push(ServerEvent::NewMessage(confirmation(&optimistic, "m1")))
        .await;

    eventually!(session.messages().await.iter().any(|m| m.id == "m1"));
    eventually!(!session.state().read().await.messages.is_loading());
    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[0].content.as_deref(), Some("hi"));

    let conversations = session.conversations().await;
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].id, "c1");
    assert_eq!(conversations[0].unread_count, 0);
    assert!(!conversations[0].is_virtual);
    assert_eq!(conversations[0].last_message().map(|m| m.id.as_str()), Some("m1"));
}

#[tokio::test]
async fn test_inactive_conversation_counts_unread_and_moves_first() {
    let api = FakeApi::with_conversations(vec![conversation("c1", "a", 100), conversation("c2", "b", 50)]);
    let transport = FakeTransport::new();
    let session = connected_session(&api, &transport).await;
    assert_ok!(session.fetch_all(1, 20).await);
    let c1 = session.conversations().await[0].clone();
    session.set_active(c1, false).await;

    transport
        .push(ServerEvent::NewMessage(message("m9", "c2", "b", "yo", 200)))
        .await;

    eventually!(session.conversations().await[0].id == "c2");
    let conversations = session.conversations().await;
    assert_eq!(conversations[0].unread_count, 1);
    assert_eq!(conversations[1].id, "c1");
    // The active list only shows c1.
    assert!(session.messages().await.is_empty());
}

#[tokio::test]
async fn test_replayed_confirmation_is_applied_once() {
    let api = FakeApi::with_conversations(vec![conversation("c1", "a", 1)]);
    let transport = FakeTransport::new();
    let session = connected_session(&api, &transport).await;
    assert_ok!(session.fetch_all(1, 20).await);
    let c1 = session.conversations().await[0].clone();
    session.set_active(c1, false).await;

    let optimistic = assert_ok!(session.send_message("c1", Some("once".into()), None).await).unwrap();
    let confirmed = confirmation(&optimistic, "m1");
    transport.push(ServerEvent::NewMessage(confirmed.clone())).await;
    transport.push(ServerEvent::NewMessage(confirmed)).await;
    transport
        .push(ServerEvent::NewMessage(message("m2", "c1", "a", "after", 9_999_999_999)))
        .await;

    eventually!(session.messages().await.len() == 2);
    let ids: Vec<_> = session.messages().await.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    let c1 = session.conversations().await[0].clone();
    assert_eq!(c1.preview_messages.len(), 2);
    assert_eq!(c1.unread_count, 0);
}

#[tokio::test]
async fn test_confirmation_without_correlation_id() {
    let api = FakeApi::with_conversations(vec![conversation("c1", "a", 1)]);
    let transport = FakeTransport::new();
    let session = connected_session(&api, &transport).await;
    assert_ok!(session.fetch_all(1, 20).await);
    let c1 = session.conversations().await[0].clone();
    session.set_active(c1, false).await;

    let first = assert_ok!(session.send_message("c1", Some("same".into()), None).await).unwrap();
    let second = assert_ok!(session.send_message("c1", Some("same".into()), None).await).unwrap();

    let mut server_copy = confirmation(&first, "m1");
    server_copy.client_ref = None;
    transport.push(ServerEvent::NewMessage(server_copy)).await;

    eventually!(session.messages().await[0].id == "m1");
    let ids: Vec<_> = session.messages().await.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["m1".to_string(), second.id]);
}

#[tokio::test]
async fn test_attachment_send_is_reconciled() {
    let api = FakeApi::with_conversations(vec![conversation("c1", "a", 1)]);
    let transport = FakeTransport::new();
    let session = connected_session(&api, &transport).await;
    assert_ok!(session.fetch_all(1, 20).await);
    let c1 = session.conversations().await[0].clone();
    session.set_active(c1, false).await;

    let optimistic = assert_ok!(
        session
            .send_message("c1", None, Some(Attachment::inline("cat.png", "image/png", vec![1, 2, 3])))
            .await
    )
    .unwrap();

    let mut persisted = confirmation(&optimistic, "m1");
    persisted.attachment = Some(Attachment::Reference {
        url: "https://files.example.com/cat.png".to_string(),
        file_name: Some("cat.png".to_string()),
        mime_type: Some("image/png".to_string()),
    });
    transport.push(ServerEvent::NewMessage(persisted)).await;

    eventually!(session.messages().await[0].id == "m1");
    assert_matches!(
        session.messages().await[0].attachment,
        Some(Attachment::Reference { .. })
    );
}

#[tokio::test]
async fn test_send_while_disconnected_is_dropped() {
    let api = FakeApi::with_conversations(vec![conversation("c1", "a", 1)]);
    let transport = FakeTransport::new();
    transport.refuse(true);
    let session = login(&api, &transport).await;
    assert_ok!(session.fetch_all(1, 20).await);

    let sent = assert_ok!(session.send_message("c1", Some("lost".into()), None).await);
    assert!(sent.is_none());
    assert!(session.messages().await.is_empty());
    assert!(session.conversations().await[0].preview_messages.is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_read_acknowledgment_marks_own_messages() {
    let api = FakeApi::with_conversations(vec![conversation("c1", "a", 1)]);
    let transport = FakeTransport::new();
    let session = connected_session(&api, &transport).await;
    assert_ok!(session.fetch_all(1, 20).await);
    let c1 = session.conversations().await[0].clone();
    session.set_active(c1, false).await;

    let optimistic = assert_ok!(session.send_message("c1", Some("seen?".into()), None).await).unwrap();
    transport
        .push(ServerEvent::NewMessage(confirmation(&optimistic, "m1")))
        .await;
    transport
        .push(ServerEvent::MessagesRead {
            conversation_id: "c1".to_string(),
            reader_id: "a".to_string(),
        })
        .await;

    eventually!(session.messages().await.first().is_some_and(|m| m.is_read));
    assert!(session.conversations().await[0].preview_messages[0].is_read);
}
