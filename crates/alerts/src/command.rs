//! Chat command parsing.
//!
//! A command is a text message whose first token is the bot's mention,
//! e.g. `@coinwatch_bot watch btc 500`. Parsing never fails: anything that
//! cannot be understood becomes [`Parsed::Malformed`] and is answered with
//! the help text.

use crate::chat::{InboundMessage, MessageKind};
use coinwatch_core::{parse_threshold, WatchKey};

/// A recognized bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Watch { symbol: WatchKey, threshold: u32 },
    Unwatch { symbol: WatchKey },
    Watchlist,
    Coin { symbols: Vec<String> },
    Rank { limit: usize },
    Help,
}

impl Command {
    /// Commands that hit the ticker source and run off the receive loop.
    pub fn needs_fetch(&self) -> bool {
        matches!(
            self,
            Command::Watch { .. } | Command::Coin { .. } | Command::Rank { .. }
        )
    }
}

/// Outcome of parsing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Not addressed to the bot.
    Ignored,
    Recognized(Command),
    /// Well-formed but invalid input; the string is the reply.
    Rejected(String),
    /// Wrong shape; answered with help. The string is for logs only.
    Malformed(String),
}

/// Parser bound to the bot's own mention.
#[derive(Debug, Clone)]
pub struct CommandParser {
    identity: String,
    rank_default: usize,
}

impl CommandParser {
    pub fn new(identity: impl Into<String>, rank_default: usize) -> Self {
        Self {
            identity: identity.into(),
            rank_default,
        }
    }

    pub fn parse(&self, message: &InboundMessage) -> Parsed {
        if message.kind != MessageKind::Message {
            return Parsed::Ignored;
        }

        let parts: Vec<&str> = message.text.split_whitespace().collect();
        match parts.first() {
            Some(mention) if mention.eq_ignore_ascii_case(&self.identity) => {}
            _ => return Parsed::Ignored,
        }

        let Some(name) = parts.get(1) else {
            return Parsed::Malformed("missing command".to_string());
        };
        let args = &parts[2..];

        match name.to_lowercase().as_str() {
            "watch" => match args {
                [symbol, threshold] => match parse_threshold(threshold) {
                    Ok(threshold) => Parsed::Recognized(Command::Watch {
                        symbol: WatchKey::new(symbol),
                        threshold,
                    }),
                    Err(e) => Parsed::Rejected(e.to_string()),
                },
                _ => Parsed::Malformed(format!("watch expects 2 arguments, got {}", args.len())),
            },
            "unwatch" => match args {
                [symbol] => Parsed::Recognized(Command::Unwatch {
                    symbol: WatchKey::new(symbol),
                }),
                _ => Parsed::Malformed(format!("unwatch expects 1 argument, got {}", args.len())),
            },
            "watchlist" => Parsed::Recognized(Command::Watchlist),
            "coin" => {
                if args.is_empty() {
                    Parsed::Malformed("coin expects at least 1 symbol".to_string())
                } else {
                    Parsed::Recognized(Command::Coin {
                        symbols: args.iter().map(|s| s.to_string()).collect(),
                    })
                }
            }
            "rank" => {
                let limit = args
                    .first()
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(self.rank_default);
                Parsed::Recognized(Command::Rank { limit })
            }
            _ => Parsed::Recognized(Command::Help),
        }
    }
}
