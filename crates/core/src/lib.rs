//! Core data types for the coin watch bot.

pub mod ticker;
pub mod watch;

pub use ticker::*;
pub use watch::*;
