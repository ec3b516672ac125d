//! # Realtime Connection Manager
//!
//! Owns the single realtime connection of a session.
//!
//! ## Lifecycle
//!
//! - `connect` spawns a supervisor task (no-op while one is alive)
//! - the supervisor opens the transport, forwards every frame to the dispatcher
//!   channel as an [`InboundEvent`] and reconnects with bounded backoff
//! - once the budget is spent the status is [`ConnectionStatus::Failed`] until
//!   `reconnect` is called
//! - `disconnect` tears everything down
//!
//! Dropping the connection never touches cached conversations or messages.

pub mod retry;
pub mod sse;
pub mod transport;

pub use retry::{BackoffStrategy, ReconnectPolicy};
pub use sse::SseTransport;
pub use transport::{Credentials, LinkFrame, RealtimeLink, RealtimeTransport};

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::shared::error::{Result, SyncError};
use crate::shared::event::{InboundEvent, OutboundEvent};

/// Observable state of the realtime channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting before reconnect attempt `attempt`
    Reconnecting { attempt: u32 },
    /// Reconnect budget exhausted; needs an explicit reconnect
    Failed,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

type OutboundSink = Arc<RwLock<Option<mpsc::UnboundedSender<OutboundEvent>>>>;

/// Single realtime connection for a session
pub struct ConnectionManager {
    transport: Arc<dyn RealtimeTransport>,
    policy: ReconnectPolicy,
    events: mpsc::Sender<InboundEvent>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    outbound: OutboundSink,
    session: RwLock<Option<(String, Credentials)>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("policy", &self.policy)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// `events` is the dispatcher's inbound channel
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        policy: ReconnectPolicy,
        events: mpsc::Sender<InboundEvent>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            transport,
            policy,
            events,
            status: Arc::new(status),
            outbound: Arc::new(RwLock::new(None)),
            session: RwLock::new(None),
            supervisor: Mutex::new(None),
        }
    }

    /// Open the realtime channel. A no-op while a connection task is alive.
    pub async fn connect(&self, credentials: Credentials, user_id: impl Into<String>) {
        let user_id = user_id.into();
        let mut supervisor = self.supervisor.lock().await;
        if supervisor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("[CONN] Connection already active, ignoring connect");
            return;
        }

        *self.session.write().await = Some((user_id.clone(), credentials.clone()));
        tracing::info!("[CONN] Connecting realtime channel for {}", user_id);

        *supervisor = Some(tokio::spawn(supervise(
            self.transport.clone(),
            self.policy.clone(),
            credentials,
            user_id,
            self.events.clone(),
            self.status.clone(),
            self.outbound.clone(),
        )));
    }

    /// Reconnect with the credentials of the last `connect` call.
    pub async fn reconnect(&self) -> Result<()> {
        let session = self.session.read().await.clone();
        let (user_id, credentials) = session.ok_or(SyncError::NotConnected)?;
        self.connect(credentials, user_id).await;
        Ok(())
    }

    /// Release the connection (logout)
    pub async fn disconnect(&self) {
        if let Some(handle) = self.supervisor.lock().await.take() {
            handle.abort();
        }
        *self.outbound.write().await = None;
        *self.session.write().await = None;
        self.status.send_replace(ConnectionStatus::Disconnected);
        tracing::info!("[CONN] Disconnected");
    }

    /// Deliver an event to the server. Fails with `NotConnected` (after a
    /// warning) when no link is open; nothing is queued.
    pub async fn emit(&self, event: OutboundEvent) -> Result<()> {
        let outbound = self.outbound.read().await;
        match outbound.as_ref() {
            Some(sink) if self.is_connected() => sink.send(event).map_err(|rejected| {
                tracing::warn!("[CONN] Link closed, dropping {}", rejected.0.name());
                SyncError::NotConnected
            }),
            _ => {
                tracing::warn!("[CONN] Not connected, dropping {}", event.name());
                Err(SyncError::NotConnected)
            }
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// User the connection was opened for
    pub async fn user_id(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|(user, _)| user.clone())
    }
}

async fn supervise(
    transport: Arc<dyn RealtimeTransport>,
    policy: ReconnectPolicy,
    credentials: Credentials,
    user_id: String,
    events: mpsc::Sender<InboundEvent>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    outbound: OutboundSink,
) {
    let mut attempt = 0u32;

    loop {
        if attempt == 0 {
            status.send_replace(ConnectionStatus::Connecting);
        } else {
            if !policy.allows(attempt) {
                tracing::warn!(
                    "[CONN] Giving up after {} reconnect attempts",
                    policy.max_attempts
                );
                status.send_replace(ConnectionStatus::Failed);
                return;
            }
            status.send_replace(ConnectionStatus::Reconnecting { attempt });
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }

        let link = match transport.open(&user_id, &credentials).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!("[CONN] Connect error: {}", e);
                if events
                    .send(InboundEvent::ConnectError {
                        reason: e.to_string(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                attempt += 1;
                continue;
            }
        };

        let RealtimeLink {
            inbound,
            outbound: sink,
        } = link;
        *outbound.write().await = Some(sink);
        status.send_replace(ConnectionStatus::Connected);
        tracing::info!("[CONN] Connected");
        if events.send(InboundEvent::Connected).await.is_err() {
            return;
        }

        let closed = pump(inbound, &events).await;
        *outbound.write().await = None;
        status.send_replace(ConnectionStatus::Disconnected);

        let Some(reason) = closed else {
            // Dispatcher is gone; the session is over.
            return;
        };
        tracing::warn!("[CONN] Disconnected: {}", reason);
        if events
            .send(InboundEvent::Disconnected { reason })
            .await
            .is_err()
        {
            return;
        }
        attempt = 1;
    }
}

/// Forward link frames until the link closes. Returns the close reason, or
/// `None` if the dispatcher stopped listening.
async fn pump(
    mut inbound: mpsc::Receiver<LinkFrame>,
    events: &mpsc::Sender<InboundEvent>,
) -> Option<String> {
    while let Some(frame) = inbound.recv().await {
        match frame {
            LinkFrame::Event(event) => {
                if events.send(event.into()).await.is_err() {
                    return None;
                }
            }
            LinkFrame::Closed { reason } => return Some(reason),
        }
    }
    Some("transport closed".to_string())
}
