//! In-memory realtime channel

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use xfchat::client::connection::{LinkFrame, RealtimeLink};
use xfchat::client::{Credentials, RealtimeTransport};
use xfchat::shared::{OutboundEvent, Result, ServerEvent, SyncError};

/// Fake [`RealtimeTransport`]: tests push server events into the open link
/// and inspect what the client emitted.
#[derive(Default)]
pub struct FakeTransport {
    link: Mutex<Option<mpsc::Sender<LinkFrame>>>,
    refuse: Mutex<bool>,
    sent: Arc<Mutex<Vec<OutboundEvent>>>,
    pub opens: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse every open from now on
    pub fn refuse(&self, refuse: bool) {
        *self.refuse.lock().unwrap() = refuse;
    }

    pub async fn push(&self, event: ServerEvent) {
        let link = self.link.lock().unwrap().clone().expect("no open link");
        link.send(LinkFrame::Event(event)).await.expect("link closed");
    }

    /// Close the open link from the server side
    pub async fn close(&self, reason: &str) {
        let link = self.link.lock().unwrap().take().expect("no open link");
        let _ = link
            .send(LinkFrame::Closed {
                reason: reason.to_string(),
            })
            .await;
    }

    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_named(&self, name: &str) -> Vec<OutboundEvent> {
        self.sent()
            .into_iter()
            .filter(|event| event.name() == name)
            .collect()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl RealtimeTransport for FakeTransport {
    async fn open(&self, _user_id: &str, credentials: &Credentials) -> Result<RealtimeLink> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if *self.refuse.lock().unwrap() {
            return Err(SyncError::network("connection refused"));
        }
        assert_eq!(credentials.token, "token");

        let (frames_tx, frames_rx) = mpsc::channel(64);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        *self.link.lock().unwrap() = Some(frames_tx);

        let sent = self.sent.clone();
        tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                sent.lock().unwrap().push(event);
            }
        });

        Ok(RealtimeLink {
            inbound: frames_rx,
            outbound: outbound_tx,
        })
    }
}
