//! Server-Sent Events transport
//!
//! Inbound events arrive on a long-lived `GET /realtime/events` stream:
//!
//! ```http
//! GET /realtime/events HTTP/1.1
//! Subscribe: true
//! Authorization: Bearer <token>
//! X-User-Id: <user>
//!
//! event: newMessage
//! data: {"id":"m1","conversationId":"c1",...}
//!
//! ```
//!
//! Outbound events are `POST /realtime/emit` with the `{event, data}` envelope.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;

use super::transport::{Credentials, LinkFrame, RealtimeLink, RealtimeTransport};
use crate::client::config::Config;
use crate::shared::error::{Result, SyncError};
use crate::shared::event::{OutboundEvent, ServerEvent};

const INBOUND_BUFFER: usize = 256;

/// [`RealtimeTransport`] over SSE + HTTP POST
#[derive(Debug, Clone)]
pub struct SseTransport {
    config: Config,
    client: Client,
}

impl SseTransport {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RealtimeTransport for SseTransport {
    async fn open(&self, user_id: &str, credentials: &Credentials) -> Result<RealtimeLink> {
        let url = self.config.api_url("/realtime/events");
        tracing::info!("[SSE] Subscribing: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Subscribe", "true")
            .header("Accept", "text/event-stream")
            .header("Authorization", format!("Bearer {}", credentials.token))
            .header("X-User-Id", user_id)
            .send()
            .await
            .map_err(|e| SyncError::network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SyncError::api(status.as_u16(), status.to_string()));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(read_stream(response, inbound_tx));
        tokio::spawn(write_events(
            self.client.clone(),
            self.config.api_url("/realtime/emit"),
            credentials.clone(),
            user_id.to_string(),
            outbound_rx,
        ));

        Ok(RealtimeLink {
            inbound: inbound_rx,
            outbound: outbound_tx,
        })
    }
}

async fn read_stream(response: reqwest::Response, tx: mpsc::Sender<LinkFrame>) {
    let mut stream = response.bytes_stream();
    let mut parser = SseParser::default();

    let reason = loop {
        tokio::select! {
            _ = tx.closed() => return,
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for frame in parser.feed(&bytes) {
                        let name = frame.event.as_deref().unwrap_or("message");
                        match ServerEvent::from_parts(name, &frame.data) {
                            Ok(event) => {
                                tracing::debug!("[SSE] {} received", event.name());
                                if tx.send(LinkFrame::Event(event)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::debug!("[SSE] Skipping event '{}': {}", name, e);
                            }
                        }
                    }
                }
                Some(Err(e)) => break format!("stream error: {}", e),
                None => break "server closed stream".to_string(),
            }
        }
    };

    tracing::warn!("[SSE] Stream ended: {}", reason);
    let _ = tx.send(LinkFrame::Closed { reason }).await;
}

async fn write_events(
    client: Client,
    url: String,
    credentials: Credentials,
    user_id: String,
    mut rx: mpsc::UnboundedReceiver<OutboundEvent>,
) {
    while let Some(event) = rx.recv().await {
        let result = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", credentials.token))
            .header("X-User-Id", &user_id)
            .json(&event)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("[SSE] Emitted {}", event.name());
            }
            Ok(response) => {
                tracing::warn!("[SSE] Emit {} rejected: {}", event.name(), response.status());
            }
            Err(e) => {
                tracing::warn!("[SSE] Emit {} failed: {}", event.name(), e);
            }
        }
    }
}

/// One dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder. Buffers raw bytes so multi-byte characters split
/// across chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if !self.data.is_empty() {
                    frames.push(SseFrame {
                        event: self.event.take(),
                        data: self.data.join("\n"),
                    });
                    self.data.clear();
                } else {
                    self.event = None;
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        frames
    }
}
