//! Telegram transport for the chat bridge.
//!
//! Inbound messages are read with long polling (`getUpdates`), one batch at a
//! time; the batch is buffered so `receive` hands out a single message per
//! call. Group chats address the bot as `@username`, which is the identity
//! returned by [`TelegramBridge::connect`].

use crate::chat::{ChatBridge, ChatError, InboundMessage, MessageKind, OutboundMessage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{UpdateKind, User};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Long-poll timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u32 = 10;

/// HTTP request timeout. Must outlast a long poll that returns empty.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(POLL_TIMEOUT_SECS as u64 + 10);

#[derive(Default)]
struct PollState {
    offset: i32,
    pending: VecDeque<InboundMessage>,
}

impl PollState {
    /// Advance past every update and queue the ones that carry a message.
    fn absorb(&mut self, updates: Vec<Update>) {
        for update in updates {
            self.offset = update.id.as_offset();
            if let Some(message) = inbound(update) {
                self.pending.push_back(message);
            }
        }
    }
}

/// Telegram bot session.
pub struct TelegramBridge {
    bot: Bot,
    state: Mutex<PollState>,
}

impl TelegramBridge {
    /// Authenticate with the bot token. Returns the bridge and the bot's
    /// mention (`@username`).
    pub async fn connect(token: &str) -> Result<(Self, String), ChatError> {
        let bot = build_bot(token)?;
        let me = bot.get_me().await?;
        let identity = mention(&me.user);
        info!(identity = %identity, "Connected to Telegram");

        Ok((Self::from_bot(bot), identity))
    }

    fn from_bot(bot: Bot) -> Self {
        Self {
            bot,
            state: Mutex::new(PollState::default()),
        }
    }
}

fn build_bot(token: &str) -> Result<Bot, ChatError> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .map_err(|e| ChatError::Client(e.to_string()))?;
    Ok(Bot::with_client(token, client))
}

fn mention(user: &User) -> String {
    match &user.username {
        Some(username) => format!("@{}", username),
        None => format!("@{}", user.id.0),
    }
}

fn chat_id(channel_id: &str) -> Result<ChatId, ChatError> {
    channel_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| ChatError::InvalidChannel(channel_id.to_string()))
}

fn inbound(update: Update) -> Option<InboundMessage> {
    match update.kind {
        UpdateKind::Message(msg) => {
            let channel_id = msg.chat.id.0.to_string();
            Some(match msg.text() {
                Some(text) => InboundMessage::text(channel_id, text),
                None => InboundMessage {
                    channel_id,
                    text: String::new(),
                    kind: MessageKind::Other,
                },
            })
        }
        _ => None,
    }
}

#[async_trait]
impl ChatBridge for TelegramBridge {
    async fn receive(&self) -> Result<InboundMessage, ChatError> {
        let mut state = self.state.lock().await;
        loop {
            if let Some(message) = state.pending.pop_front() {
                return Ok(message);
            }

            let updates = self
                .bot
                .get_updates()
                .offset(state.offset)
                .timeout(POLL_TIMEOUT_SECS)
                .await?;
            debug!(count = updates.len(), offset = state.offset, "Polled updates");
            state.absorb(updates);
        }
    }

    async fn send(&self, message: OutboundMessage) -> Result<(), ChatError> {
        let chat = chat_id(&message.channel_id)?;
        self.bot.send_message(chat, message.text).await?;
        Ok(())
    }
}
