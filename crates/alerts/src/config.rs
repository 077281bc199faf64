//! Scheduler and command settings.

use std::time::Duration;

/// Settings for the price poll cycle.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Start a new cycle even while the previous one is still running.
    pub allow_overlap: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            allow_overlap: false,
        }
    }
}

impl SchedulerConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }
}

/// Settings for chat commands.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Rows returned by `rank` without a usable argument.
    pub rank_default: usize,
    /// Upper bound on rows returned by `rank`.
    pub rank_max: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            rank_default: 10,
            rank_max: 30,
        }
    }
}
