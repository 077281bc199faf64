//! Chat transport abstraction and the outbound message queue.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("Invalid channel id: {0}")]
    InvalidChannel(String),
    #[error("Chat session closed")]
    Closed,
}

/// Kind of an inbound chat event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A text message
    Message,
    /// Anything else (joins, media without caption, ...)
    Other,
}

/// Message received from the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: String,
    pub text: String,
    pub kind: MessageKind,
}

impl InboundMessage {
    /// A text message from `channel_id`.
    pub fn text(channel_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            text: text.into(),
            kind: MessageKind::Message,
        }
    }

    /// Build a reply addressed to the same channel.
    pub fn reply(&self, text: impl Into<String>) -> OutboundMessage {
        OutboundMessage::new(self.channel_id.clone(), text)
    }
}

/// Message to be posted to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel_id: String,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(channel_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            text: text.into(),
        }
    }
}

/// Connected chat session.
#[async_trait]
pub trait ChatBridge: Send + Sync {
    /// Wait for the next inbound message. Errors are fatal for the session.
    async fn receive(&self) -> Result<InboundMessage, ChatError>;

    /// Post a message.
    async fn send(&self, message: OutboundMessage) -> Result<(), ChatError>;
}

/// Sending half of the outbound queue, shared by commands and the scheduler.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<OutboundMessage>,
}

impl Outbox {
    /// Create an outbox and the receiver drained by [`run_outbox`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a message. Dropped with a warning once the sender task is gone.
    pub async fn post(&self, message: OutboundMessage) {
        if let Err(e) = self.tx.send(message).await {
            warn!(channel = %e.0.channel_id, "Outbox closed, dropping message");
        }
    }
}

/// Deliver queued messages until every [`Outbox`] handle is dropped.
pub async fn run_outbox(bridge: Arc<dyn ChatBridge>, mut rx: mpsc::Receiver<OutboundMessage>) {
    while let Some(message) = rx.recv().await {
        let channel = message.channel_id.clone();
        match bridge.send(message).await {
            Ok(()) => debug!(channel = %channel, "Message sent"),
            Err(e) => error!(channel = %channel, error = %e, "Failed to send message"),
        }
    }
    debug!("Outbox drained");
}
