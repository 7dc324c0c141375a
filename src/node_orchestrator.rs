use anyhow::{Context, Result};
use events::{EventManager, HandlerKind, Notification};
use fee_oracle::{FeeOracle, OracleConfig};
use ledger::{Block, BlockHash, BlockStore, Ledger, LedgerError, MemoryLedger};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

/// Configuration for the fee oracle node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// sled block store location; the chain lives in memory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datadir: Option<PathBuf>,

    /// Synthetic blocks written to an empty chain before the oracle starts
    pub history_blocks: u64,

    pub block_interval_ms: u64,

    /// Blocks to produce before stopping, 0 for unlimited
    pub max_blocks: u64,

    pub report_interval_ms: u64,

    pub max_txs_per_block: usize,

    /// Starting point of the simulated fee market
    pub base_fee_rate: u64,

    pub oracle: OracleConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            datadir: None,
            history_blocks: 64,
            block_interval_ms: 1_000,
            max_blocks: 0,
            report_interval_ms: 5_000,
            max_txs_per_block: 40,
            base_fee_rate: 20_000_000_000,
            oracle: OracleConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.oracle.validate()?;
        anyhow::ensure!(self.block_interval_ms > 0, "block_interval_ms must be positive");
        anyhow::ensure!(self.report_interval_ms > 0, "report_interval_ms must be positive");
        Ok(())
    }
}

/// Chain backing the node
enum ChainBackend {
    Memory(MemoryLedger),
    Store(BlockStore),
}

impl ChainBackend {
    fn open(datadir: Option<&Path>) -> Result<Self> {
        match datadir {
            Some(dir) => {
                std::fs::create_dir_all(dir).context("Failed to create data directory")?;
                let store = BlockStore::open(dir.join("blocks"))
                    .context("Failed to open block store")?;
                Ok(ChainBackend::Store(store))
            }
            None => Ok(ChainBackend::Memory(MemoryLedger::new())),
        }
    }

    fn append(&self, block: Block) -> Result<(), LedgerError> {
        match self {
            ChainBackend::Memory(ledger) => ledger.append(block),
            ChainBackend::Store(store) => store.store(&block),
        }
    }

    fn flush(&self) -> Result<(), LedgerError> {
        match self {
            ChainBackend::Memory(_) => Ok(()),
            ChainBackend::Store(store) => store.flush(),
        }
    }
}

impl Ledger for ChainBackend {
    fn best_block(&self) -> Result<Option<Block>, LedgerError> {
        match self {
            ChainBackend::Memory(ledger) => ledger.best_block(),
            ChainBackend::Store(store) => store.best_block(),
        }
    }

    fn block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, LedgerError> {
        match self {
            ChainBackend::Memory(ledger) => ledger.block_by_hash(hash),
            ChainBackend::Store(store) => store.block_by_hash(hash),
        }
    }
}

/// Simulated fee market: demand follows a bounded random walk
struct BlockProducer {
    fee_rate: u64,
    max_txs: usize,
}

impl BlockProducer {
    fn new(base_fee_rate: u64, max_txs: usize) -> Self {
        Self {
            fee_rate: base_fee_rate.max(1),
            max_txs,
        }
    }

    fn next_fees(&mut self) -> Vec<u64> {
        let mut rng = rand::thread_rng();

        let drift: u64 = rng.gen_range(90..=110);
        self.fee_rate = (self.fee_rate.saturating_mul(drift) / 100).max(1);

        let tx_count = rng.gen_range(0..=self.max_txs);
        (0..tx_count)
            .map(|_| self.fee_rate.saturating_mul(rng.gen_range(50..=200)) / 100)
            .collect()
    }

    /// Build the next block on `chain` and append it
    fn produce(&mut self, chain: &ChainBackend, timestamp: u64) -> Result<Block> {
        let tip = chain.best_block()?.context("Chain has no genesis block")?;
        let timestamp = timestamp.max(tip.timestamp.saturating_add(1));
        let block = Block::child_of(&tip, timestamp, self.next_fees());
        chain.append(block.clone())?;

        debug!(
            "Produced block {} at height {} with {} transactions",
            block.hash,
            block.height,
            block.tx_count()
        );
        Ok(block)
    }
}

const SEED_SPACING_SECS: u64 = 10;

/// Timestamp of the `index`th seeded block after `start`
fn seeded_timestamp(start: u64, index: u64) -> u64 {
    start.saturating_add(index.saturating_mul(SEED_SPACING_SECS))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Wires a chain, its block notifications and the fee oracle together
pub struct NodeOrchestrator {
    config: NodeConfig,
    chain: Arc<ChainBackend>,
    events: Arc<EventManager>,
}

impl NodeOrchestrator {
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let chain = ChainBackend::open(config.datadir.as_deref())?;

        let orchestrator = Self {
            config,
            chain: Arc::new(chain),
            events: Arc::new(EventManager::new()),
        };
        orchestrator.seed_history()?;
        Ok(orchestrator)
    }

    /// Give an empty chain some history for the oracle to warm up from
    fn seed_history(&self) -> Result<()> {
        if let Some(tip) = self.chain.best_block()? {
            info!("Resuming chain at height {}", tip.height);
            return Ok(());
        }

        let history = self.config.history_blocks;
        let start = unix_now().saturating_sub(history.saturating_mul(SEED_SPACING_SECS));
        self.chain.append(Block::genesis(start))?;

        let mut producer =
            BlockProducer::new(self.config.base_fee_rate, self.config.max_txs_per_block);
        for i in 1..=history {
            producer.produce(&self.chain, seeded_timestamp(start, i))?;
        }

        info!("Seeded chain with {} historical blocks", history);
        Ok(())
    }

    /// Run until Ctrl-C or until `max_blocks` have been produced
    pub async fn start(self) -> Result<()> {
        let block_handler = self.events.handler(HandlerKind::Block);
        let oracle = FeeOracle::new(
            &*self.chain,
            Some(&*block_handler),
            self.config.oracle.clone(),
        )
        .context("Failed to initialize fee oracle")?;

        info!("Initial fee recommendation: {}", oracle.recommendation());

        let mut producer = self.start_block_producer();
        let mut report = interval(Duration::from_millis(self.config.report_interval_ms));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = &mut producer => {
                    match result {
                        Ok(Ok(produced)) => info!("Block producer finished after {} blocks", produced),
                        Ok(Err(e)) => error!("Block producer failed: {:#}", e),
                        Err(e) => error!("Block producer task failed: {}", e),
                    }
                    break;
                }
                _ = &mut shutdown => {
                    info!("Received Ctrl-C signal");
                    producer.abort();
                    break;
                }
                _ = report.tick() => {
                    let recommendation = oracle.recommendation();
                    let stats = oracle.stats();
                    info!(
                        "Fee recommendation {} (blocks ingested {}, window {}, dropped {})",
                        recommendation, stats.blocks_ingested, stats.window_len, stats.dropped
                    );
                }
            }
        }

        let stats = oracle.shutdown().await?;
        self.chain.flush()?;

        info!(
            "Node stopped: {} blocks ingested, final recommendation {}",
            stats.blocks_ingested, stats.recommendation
        );
        Ok(())
    }

    fn start_block_producer(&self) -> JoinHandle<Result<u64>> {
        let chain = self.chain.clone();
        let events = self.events.clone();
        let max_blocks = self.config.max_blocks;
        let period = Duration::from_millis(self.config.block_interval_ms);
        let mut producer =
            BlockProducer::new(self.config.base_fee_rate, self.config.max_txs_per_block);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            // First tick completes immediately
            ticker.tick().await;

            let mut produced = 0u64;
            while max_blocks == 0 || produced < max_blocks {
                ticker.tick().await;
                let block = producer.produce(&chain, unix_now())?;
                events.publish(&Notification::block_committed(block));
                produced += 1;
            }
            Ok(produced)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds_empty_memory_chain() {
        let config = NodeConfig {
            history_blocks: 12,
            ..Default::default()
        };
        let orchestrator = NodeOrchestrator::new(config).unwrap();
        let tip = orchestrator.chain.best_block().unwrap().unwrap();
        assert_eq!(tip.height, 12);
    }

    #[test]
    fn test_resumes_existing_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            datadir: Some(temp_dir.path().to_path_buf()),
            history_blocks: 5,
            ..Default::default()
        };

        {
            let orchestrator = NodeOrchestrator::new(config.clone()).unwrap();
            orchestrator.chain.flush().unwrap();
        }
        let orchestrator = NodeOrchestrator::new(config).unwrap();
        let tip = orchestrator.chain.best_block().unwrap().unwrap();
        assert_eq!(tip.height, 5);
    }

    #[test]
    fn test_seed_timestamps_saturate() {
        assert_eq!(seeded_timestamp(100, 3), 130);
        assert_eq!(seeded_timestamp(u64::MAX - 5, 1), u64::MAX);
        assert_eq!(seeded_timestamp(0, u64::MAX), u64::MAX);
        assert_eq!(
            unix_now().saturating_sub(u64::MAX.saturating_mul(SEED_SPACING_SECS)),
            0
        );
    }

    #[test]
    fn test_producer_stays_positive() {
        let mut producer = BlockProducer::new(1, 10);
        for _ in 0..100 {
            assert!(producer.next_fees().len() <= 10);
            assert!(producer.fee_rate >= 1);
        }
    }

    #[test]
    fn test_config_from_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("node.toml");
        std::fs::write(
            &path,
            "history_blocks = 3\nmax_blocks = 7\n\n[oracle]\npercentile = 80\n",
        )
        .unwrap();

        let config = NodeConfig::from_file(&path).unwrap();
        assert_eq!(config.history_blocks, 3);
        assert_eq!(config.max_blocks, 7);
        assert_eq!(config.oracle.percentile, 80);
        assert_eq!(config.oracle.window_size, 20);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_runs_to_block_limit() {
        let config = NodeConfig {
            history_blocks: 8,
            block_interval_ms: 5,
            report_interval_ms: 5,
            max_blocks: 4,
            ..Default::default()
        };
        let orchestrator = NodeOrchestrator::new(config).unwrap();
        let chain = orchestrator.chain.clone();

        orchestrator.start().await.unwrap();
        assert_eq!(chain.best_block().unwrap().unwrap().height, 12);
    }
}
