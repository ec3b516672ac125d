//! Realtime transport seam.
//!
//! A transport opens one bidirectional link to the server. The connection
//! manager owns reconnection; a transport only reports what happened on the
//! link it opened.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::shared::error::Result;
use crate::shared::event::{OutboundEvent, ServerEvent};

/// Credentials presented when opening the realtime channel
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"<redacted>").finish()
    }
}

/// Frame read from an open link
#[derive(Debug, Clone, PartialEq)]
pub enum LinkFrame {
    Event(ServerEvent),
    /// The server or network closed the link
    Closed { reason: String },
}

/// One open realtime link
#[derive(Debug)]
pub struct RealtimeLink {
    /// Server frames, in arrival order. A closed channel without a
    /// [`LinkFrame::Closed`] counts as a close with an unknown reason.
    pub inbound: mpsc::Receiver<LinkFrame>,
    /// Client events to deliver on this link
    pub outbound: mpsc::UnboundedSender<OutboundEvent>,
}

/// Opens realtime links
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn open(&self, user_id: &str, credentials: &Credentials) -> Result<RealtimeLink>;
}
