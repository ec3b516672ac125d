//! REST collaborator API
//!
//! The sync engine only needs three calls from the server's REST surface. They
//! sit behind [`ChatApi`] so the engine can run against the HTTP client below or
//! an in-memory fake.
//!
//! Each call has exactly one response envelope:
//!
//! | Call | Request | Envelope |
//! |------|---------|----------|
//! | list conversations | `GET /api/conversations?page&limit` | [`ConversationPage`] |
//! | create or fetch | `POST /api/conversations` | [`ConversationEnvelope`] |
//! | list messages | `GET /api/conversations/{id}/messages?page&limit` | [`MessagePage`] |

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::client::config::Config;
use crate::shared::error::{Result, SyncError};
use crate::shared::messaging::{
    Conversation, ConversationEnvelope, ConversationPage, CreateConversationRequest, MessagePage,
};

/// REST calls consumed by the sync engine
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch_conversations(&self, page: u32, limit: u32) -> Result<ConversationPage>;

    /// Create the canonical conversation with `peer_id`, or return the existing one
    async fn create_or_fetch_conversation(&self, peer_id: &str) -> Result<Conversation>;

    async fn fetch_messages(&self, conversation_id: &str, page: u32, limit: u32)
        -> Result<MessagePage>;
}

/// [`ChatApi`] over HTTP with bearer authentication
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    config: Config,
    client: Client,
}

impl HttpChatApi {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .config
            .get_token()
            .ok_or_else(|| SyncError::api(401, "Not authenticated"))?;
        Ok(request.header("Authorization", format!("Bearer {}", token)))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(SyncError::api(status.as_u16(), error_text));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_conversations(&self, page: u32, limit: u32) -> Result<ConversationPage> {
        let url = self.config.api_url("/api/conversations");
        tracing::debug!(%url, page, limit, "fetching conversations");
        let request = self
            .client
            .get(&url)
            .query(&[("page", page), ("limit", limit)]);
        let response = self.authorized(request)?.send().await?;
        Self::decode(response).await
    }

    async fn create_or_fetch_conversation(&self, peer_id: &str) -> Result<Conversation> {
        let url = self.config.api_url("/api/conversations");
        tracing::debug!(%url, peer_id, "creating conversation");
        let request = self.client.post(&url).json(&CreateConversationRequest {
            peer_id: peer_id.to_string(),
        });
        let response = self.authorized(request)?.send().await?;
        let envelope: ConversationEnvelope = Self::decode(response).await?;
        Ok(envelope.conversation)
    }

    async fn fetch_messages(
        &self,
        conversation_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage> {
        let url = self
            .config
            .api_url(&format!("/api/conversations/{}/messages", conversation_id));
        tracing::debug!(%url, page, limit, "fetching messages");
        let request = self
            .client
            .get(&url)
            .query(&[("page", page), ("limit", limit)]);
        let response = self.authorized(request)?.send().await?;
        Self::decode(response).await
    }
}
