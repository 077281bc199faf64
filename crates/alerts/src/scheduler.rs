//! Recurring poll-and-compare cycle over the watch registry.
//!
//! Each cycle snapshots the registry, fetches every watched asset
//! concurrently, posts an alert where the move since the last poll exceeds
//! the watch threshold, and records the fetched price. A watch whose fetch
//! fails keeps its previous price and is retried on the next cycle.

use crate::chat::{OutboundMessage, Outbox};
use crate::config::SchedulerConfig;
use crate::format::format_alert;
use crate::registry::SharedRegistry;
use coinwatch_core::{Watch, WatchKey};
use coinwatch_feeds::SharedTickerSource;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Summary of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Watches with a fetched price
    pub checked: usize,
    /// Watches skipped because the fetch failed or matched nothing
    pub skipped: usize,
    /// Alerts posted
    pub alerts: usize,
}

enum CheckOutcome {
    Skipped,
    Checked { alerted: bool },
}

/// Alert text for a price move, or None if the move stays within threshold.
///
/// A watch without a positive baseline never alerts. The comparison is
/// strict: a move equal to the threshold does not alert.
pub fn evaluate(symbol: &str, watch: &Watch, price: f64) -> Option<String> {
    if !watch.has_baseline() {
        return None;
    }
    let delta = price - watch.last_observed_price;
    if delta.abs() > f64::from(watch.threshold) {
        Some(format_alert(symbol, delta, price))
    } else {
        None
    }
}

/// Drives the fixed-interval watch cycle.
pub struct AlertScheduler {
    registry: SharedRegistry,
    source: SharedTickerSource,
    outbox: Outbox,
    config: SchedulerConfig,
    cycle_guard: Arc<Mutex<()>>,
}

impl AlertScheduler {
    pub fn new(
        registry: SharedRegistry,
        source: SharedTickerSource,
        outbox: Outbox,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            source,
            outbox,
            config,
            cycle_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Run cycles forever, one per interval. The first cycle starts one
    /// interval after this is called.
    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            allow_overlap = self.config.allow_overlap,
            "Starting alert scheduler"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if self.config.allow_overlap {
                let this = Arc::clone(&self);
                tokio::spawn(async move {
                    this.log_report(this.run_cycle().await);
                });
                continue;
            }

            match Arc::clone(&self.cycle_guard).try_lock_owned() {
                Ok(guard) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        let report = this.run_cycle().await;
                        drop(guard);
                        this.log_report(report);
                    });
                }
                Err(_) => warn!("Previous cycle still running, skipping tick"),
            }
        }
    }

    /// Run one cycle over a snapshot of the registry.
    pub async fn run_cycle(&self) -> CycleReport {
        let watches = self.registry.list_all().await;
        debug!(watches = watches.len(), "Cycle started");

        let outcomes = join_all(
            watches
                .into_iter()
                .map(|(key, watch)| self.check_watch(key, watch)),
        )
        .await;

        outcomes
            .into_iter()
            .fold(CycleReport::default(), |mut report, outcome| {
                match outcome {
                    CheckOutcome::Skipped => report.skipped += 1,
                    CheckOutcome::Checked { alerted } => {
                        report.checked += 1;
                        if alerted {
                            report.alerts += 1;
                        }
                    }
                }
                report
            })
    }

    async fn check_watch(&self, key: WatchKey, watch: Watch) -> CheckOutcome {
        debug!(key = %key, name = %watch.display_name, "Checking watch");

        let tickers = match self.source.fetch(&watch.display_name).await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!(
                    key = %key,
                    error = %e,
                    transient = e.is_transient(),
                    "Skipping watch: fetch failed"
                );
                return CheckOutcome::Skipped;
            }
        };

        let Some(ticker) = tickers
            .into_iter()
            .find(|t| t.matches_name(&watch.display_name))
        else {
            warn!(key = %key, name = %watch.display_name, "Skipping watch: no matching ticker");
            return CheckOutcome::Skipped;
        };

        let price = ticker.price_usd;
        debug!(
            key = %key,
            delta = price - watch.last_observed_price,
            threshold = watch.threshold,
            "Price checked"
        );

        let alert = evaluate(&ticker.symbol, &watch, price);
        let alerted = alert.is_some();
        if let Some(text) = alert {
            info!(key = %key, channel = %watch.channel_id, alert = %text, "Threshold crossed");
            self.outbox
                .post(OutboundMessage::new(watch.channel_id.clone(), text))
                .await;
        }

        self.registry.update_price(&key, price).await;
        CheckOutcome::Checked { alerted }
    }

    fn log_report(&self, report: CycleReport) {
        info!(
            checked = report.checked,
            skipped = report.skipped,
            alerts = report.alerts,
            "Cycle finished"
        );
    }
}
