//! Watch registry, alert scheduler and chat commands for the coin watch bot.
//!
//! This crate provides:
//! - SQLite-backed watch persistence
//! - The in-memory watch registry shared by commands and the scheduler
//! - The fixed-interval price poll that posts threshold alerts
//! - Chat command parsing and dispatch
//! - Telegram transport

pub mod bot;
pub mod chat;
pub mod command;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod format;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod telegram;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::{BotError, WatchBot};
pub use chat::{ChatBridge, ChatError, InboundMessage, MessageKind, OutboundMessage, Outbox};
pub use command::{Command, CommandParser, Parsed};
pub use config::{DispatcherConfig, SchedulerConfig};
pub use db::Database;
pub use dispatcher::CommandDispatcher;
pub use registry::{SharedRegistry, WatchRegistry};
pub use scheduler::{AlertScheduler, CycleReport};
pub use store::{StoreError, WatchStore};
pub use telegram::TelegramBridge;
