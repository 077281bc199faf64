//! Bot runtime: restores watches, then runs the scheduler, the outbox
//! sender and the receive loop until the chat session fails.

use crate::chat::{run_outbox, ChatBridge, ChatError, Outbox};
use crate::config::{DispatcherConfig, SchedulerConfig};
use crate::dispatcher::CommandDispatcher;
use crate::registry::{SharedRegistry, WatchRegistry};
use crate::scheduler::AlertScheduler;
use crate::store::{load_watches, StoreError, WatchStore};
use coinwatch_feeds::SharedTickerSource;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Wires the registry, scheduler and dispatcher to one chat session.
pub struct WatchBot {
    bridge: Arc<dyn ChatBridge>,
    identity: String,
    store: Arc<dyn WatchStore>,
    source: SharedTickerSource,
    registry: SharedRegistry,
    scheduler_config: SchedulerConfig,
    dispatcher_config: DispatcherConfig,
    outbox_capacity: usize,
}

impl WatchBot {
    pub fn new(
        bridge: Arc<dyn ChatBridge>,
        identity: impl Into<String>,
        store: Arc<dyn WatchStore>,
        source: SharedTickerSource,
    ) -> Self {
        Self {
            bridge,
            identity: identity.into(),
            store,
            source,
            registry: Arc::new(WatchRegistry::new()),
            scheduler_config: SchedulerConfig::default(),
            dispatcher_config: DispatcherConfig::default(),
            outbox_capacity: 256,
        }
    }

    pub fn with_scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler_config = config;
        self
    }

    pub fn with_dispatcher_config(mut self, config: DispatcherConfig) -> Self {
        self.dispatcher_config = config;
        self
    }

    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity;
        self
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Load persisted watches into the registry. Returns the registry size.
    pub async fn restore(&self) -> Result<usize, BotError> {
        let watches = load_watches(self.store.as_ref()).await?;
        for (key, watch) in &watches {
            info!(key = %key, name = %watch.display_name, threshold = watch.threshold, "Loaded watch");
        }
        Ok(self.registry.load(watches).await)
    }

    /// Run until the chat session fails. Never returns `Ok`.
    pub async fn run(self) -> Result<(), BotError> {
        let restored = self.restore().await?;
        info!(watches = restored, identity = %self.identity, "coinwatch ready");

        let (outbox, rx) = Outbox::channel(self.outbox_capacity);
        let sender = tokio::spawn(run_outbox(Arc::clone(&self.bridge), rx));

        let scheduler = Arc::new(AlertScheduler::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.source),
            outbox.clone(),
            self.scheduler_config.clone(),
        ));
        let scheduler_handle = tokio::spawn(scheduler.run());

        let dispatcher = Arc::new(CommandDispatcher::new(
            self.identity.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.source),
            outbox,
            self.dispatcher_config.clone(),
        ));

        let err = receive_loop(self.bridge.as_ref(), &dispatcher).await;
        warn!(error = %err, "Receive loop stopped");

        scheduler_handle.abort();
        let _ = scheduler_handle.await;
        drop(dispatcher);
        // In-flight commands still hold outbox handles; give them a moment.
        if tokio::time::timeout(Duration::from_secs(2), sender).await.is_err() {
            warn!("Outbox not drained before shutdown");
        }

        Err(err.into())
    }
}

/// Read and dispatch messages one at a time until `receive` fails.
pub async fn receive_loop(bridge: &dyn ChatBridge, dispatcher: &Arc<CommandDispatcher>) -> ChatError {
    loop {
        match bridge.receive().await {
            Ok(message) => {
                dispatcher.dispatch(message).await;
            }
            Err(e) => return e,
        }
    }
}
