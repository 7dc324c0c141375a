use crate::bootstrap::{bootstrap, BootstrapReport};
use crate::bridge::NotificationBridge;
use crate::cache::RecommendationCache;
use crate::config::OracleConfig;
use crate::error::{OracleError, Result};
use crate::strategy::{BlockPriceStrategy, PriceStrategy, StrategyConfig};
use crate::worker::{IngestionWorker, OracleEvent, WorkerState};
use events::{EventHandler, HandlerKind, Subscription};
use ledger::Ledger;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// State shared by the ingestion worker and query callers, behind one lock
pub(crate) struct OracleState {
    pub(crate) strategy: Box<dyn PriceStrategy>,
    pub(crate) cache: RecommendationCache,
    pub(crate) blocks_ingested: u64,
}

pub(crate) type SharedState = Arc<Mutex<OracleState>>;

/// Point-in-time view of the oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleStats {
    pub recommendation: u64,
    pub flush_counter: i64,
    pub recomputations: u64,
    pub blocks_ingested: u64,
    pub window_len: usize,
    pub forwarded: u64,
    pub dropped: u64,
    pub subscribed: bool,
}

/// Recommends a transaction fee from recently committed blocks.
///
/// Construction seeds the price strategy from ledger history, subscribes to
/// block-commit notifications and spawns the ingestion worker, so it must run
/// inside a tokio runtime. Queries are served from a cache that is refreshed
/// at most once per `flush_interval` ingested blocks.
pub struct FeeOracle {
    config: OracleConfig,
    state: SharedState,
    sender: mpsc::Sender<OracleEvent>,
    bridge: Arc<NotificationBridge>,
    subscription: Option<Subscription>,
    worker: Option<JoinHandle<WorkerState>>,
    bootstrap: BootstrapReport,
}

impl FeeOracle {
    pub fn new<L: Ledger + ?Sized>(
        ledger: &L,
        handler: Option<&EventHandler>,
        config: OracleConfig,
    ) -> Result<Self> {
        config.validate()?;
        let strategy = BlockPriceStrategy::new(StrategyConfig::from(&config))?;
        Self::with_strategy(ledger, handler, config, Box::new(strategy))
    }

    /// Build an oracle around a custom price strategy
    pub fn with_strategy<L: Ledger + ?Sized>(
        ledger: &L,
        handler: Option<&EventHandler>,
        config: OracleConfig,
        mut strategy: Box<dyn PriceStrategy>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing fee oracle (window {}, percentile {}, bounds {}..={})",
            config.window_size, config.percentile, config.min_default, config.max_configured
        );

        let report = bootstrap(ledger, &mut *strategy, config.bootstrap_limit)?;

        let state = Arc::new(Mutex::new(OracleState {
            strategy,
            cache: RecommendationCache::new(
                config.min_default,
                config.max_configured,
                config.flush_interval,
            ),
            blocks_ingested: 0,
        }));

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let bridge = Arc::new(NotificationBridge::new(sender.clone()));

        let subscription = match handler {
            Some(handler) if handler.kind() == HandlerKind::Block => {
                Some(handler.subscribe(bridge.clone()))
            }
            Some(handler) => {
                error!(
                    "Fee oracle given a {:?} handler, block updates disabled",
                    handler.kind()
                );
                None
            }
            None => {
                error!("Fee oracle has no block handler, block updates disabled");
                None
            }
        };

        let worker = IngestionWorker::new(receiver, state.clone()).spawn();

        Ok(Self {
            config,
            state,
            sender,
            bridge,
            subscription,
            worker: Some(worker),
            bootstrap: report,
        })
    }

    /// Current recommended fee
    pub fn recommendation(&self) -> u64 {
        let mut state = self.state.lock();
        let OracleState {
            strategy, cache, ..
        } = &mut *state;
        cache.get_or_recompute(&**strategy)
    }

    pub fn stats(&self) -> OracleStats {
        let state = self.state.lock();
        OracleStats {
            recommendation: state.cache.value(),
            flush_counter: state.cache.flush_counter(),
            recomputations: state.cache.recomputations(),
            blocks_ingested: state.blocks_ingested,
            window_len: state.strategy.window_len(),
            forwarded: self.bridge.forwarded(),
            dropped: self.bridge.dropped(),
            subscribed: self.is_subscribed(),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    pub fn bootstrap_report(&self) -> &BootstrapReport {
        &self.bootstrap
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Stop after every block queued so far has been applied
    pub async fn shutdown(mut self) -> Result<OracleStats> {
        info!("Shutting down fee oracle");
        self.subscription.take();

        // Awaiting send: the sentinel itself must not be dropped on a full queue
        if self.sender.send(OracleEvent::Shutdown).await.is_err() {
            debug!("Fee oracle worker already stopped");
        }

        if let Some(worker) = self.worker.take() {
            worker
                .await
                .map_err(|e| OracleError::WorkerJoin(e.to_string()))?;
        }

        let stats = self.stats();
        info!(
            "Fee oracle stopped after {} blocks, last recommendation {}",
            stats.blocks_ingested, stats.recommendation
        );
        Ok(stats)
    }
}

impl Drop for FeeOracle {
    fn drop(&mut self) {
        self.subscription.take();
        if self.worker.take().is_some() {
            // Best effort; the task is detached either way
            let _ = self.sender.try_send(OracleEvent::Shutdown);
        }
    }
}
