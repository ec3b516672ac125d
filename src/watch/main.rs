//! xfchat-watch
//!
//! Logs in, loads the conversation list and prints it whenever realtime
//! events change it. Ctrl-C logs out.
//!
//! Environment: `CLIENT_TOKEN`, `CLIENT_USER_ID`, plus the `CLIENT_API_URL` /
//! `CLIENT_RECONNECT_ATTEMPTS` overrides read by the config loader.

use std::sync::Arc;

use xfchat::client::{ChatSession, Config, Credentials, HttpChatApi, SseTransport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let token = std::env::var("CLIENT_TOKEN").map_err(|_| "CLIENT_TOKEN is not set")?;
    let user_id = std::env::var("CLIENT_USER_ID").map_err(|_| "CLIENT_USER_ID is not set")?;

    let mut config = Config::from_env(None)?;
    config.set_token(Some(token.clone()));
    tracing::info!("[WATCH] Server {}", config.server_url());

    let session = ChatSession::login(
        config.app(),
        user_id,
        Credentials::bearer(token),
        Arc::new(HttpChatApi::new(config.clone())),
        Arc::new(SseTransport::new(config.clone())),
    )
    .await;

    if let Err(e) = session
        .fetch_all(1, config.app().conversation_page_size)
        .await
    {
        tracing::error!("[WATCH] Initial load failed: {}", e);
    }
    print_conversations(&session).await;

    let mut changes = session.subscribe_changes();
    let mut status = session.connection().subscribe_status();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                print_conversations(&session).await;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                tracing::info!("[WATCH] Connection {:?}", current);
            }
        }
    }

    session.logout().await;
    Ok(())
}

async fn print_conversations(session: &ChatSession) {
    let conversations = session.conversations().await;
    println!(
        "--- {} conversations, {} unread ---",
        conversations.len(),
        session.total_unread().await
    );
    for conversation in conversations {
        let preview = conversation
            .last_message()
            .map(|m| m.preview(40))
            .unwrap_or_default();
        println!(
            "{:>3}  {:<24} {}",
            conversation.unread_count, conversation.peer_id, preview
        );
    }
}
