use crate::config::{OracleConfig, SampleMode};
use crate::error::{OracleError, Result};
use ledger::Block;
use std::collections::VecDeque;
use tracing::trace;

/// Turns a stream of committed blocks into a single recommended fee.
pub trait PriceStrategy: Send {
    /// Feed one block's fee observations
    fn process_block(&mut self, block: &Block);

    /// True until enough history has been seen for a confident estimate
    fn is_hungry(&self) -> bool;

    /// Recommendation derived from the current window; must not mutate state
    fn compute_recommendation(&self) -> u64;

    /// Number of block samples currently held
    fn window_len(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyConfig {
    pub min_default: u64,
    pub max_configured: u64,
    pub window_size: usize,
    pub percentile: u32,
    pub sample_mode: SampleMode,
}

impl From<&OracleConfig> for StrategyConfig {
    fn from(config: &OracleConfig) -> Self {
        Self {
            min_default: config.min_default,
            max_configured: config.max_configured,
            window_size: config.window_size,
            percentile: config.percentile,
            sample_mode: config.sample_mode,
        }
    }
}

/// Fee rates one block contributed to the window
#[derive(Debug, Clone)]
struct BlockSample {
    height: u64,
    fee_rates: Vec<u64>,
}

/// Windowed-percentile estimator over the most recent non-empty blocks
#[derive(Debug, Clone)]
pub struct BlockPriceStrategy {
    config: StrategyConfig,
    window: VecDeque<BlockSample>,
    blocks_seen: u64,
}

impl BlockPriceStrategy {
    pub fn new(config: StrategyConfig) -> Result<Self> {
        if config.min_default > config.max_configured {
            return Err(OracleError::Config(format!(
                "min_default {} exceeds max_configured {}",
                config.min_default, config.max_configured
            )));
        }
        if config.window_size == 0 || config.percentile > 100 {
            return Err(OracleError::Config(format!(
                "window_size {} / percentile {} out of range",
                config.window_size, config.percentile
            )));
        }

        Ok(Self {
            config,
            window: VecDeque::with_capacity(config.window_size),
            blocks_seen: 0,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Blocks passed to `process_block`, including those without transactions
    pub fn blocks_seen(&self) -> u64 {
        self.blocks_seen
    }

    pub fn observation_count(&self) -> usize {
        self.window.iter().map(|sample| sample.fee_rates.len()).sum()
    }

    /// Heights of the blocks in the window, oldest first
    pub fn window_heights(&self) -> Vec<u64> {
        self.window.iter().map(|sample| sample.height).collect()
    }

    fn sample(&self, block: &Block) -> Option<BlockSample> {
        let fee_rates = match self.config.sample_mode {
            SampleMode::AllObservations => block.fee_rates().collect::<Vec<_>>(),
            SampleMode::BlockMinimum => block.min_fee_rate().into_iter().collect(),
        };

        if fee_rates.is_empty() {
            return None;
        }

        Some(BlockSample {
            height: block.height,
            fee_rates,
        })
    }

    /// Value at `percentile` of an ascending slice
    fn percentile(sorted_values: &[u64], percentile: u32) -> u64 {
        if sorted_values.is_empty() {
            return 0;
        }

        let index = (sorted_values.len() - 1) * percentile as usize / 100;
        sorted_values[index]
    }
}

impl PriceStrategy for BlockPriceStrategy {
    fn process_block(&mut self, block: &Block) {
        self.blocks_seen += 1;

        let Some(sample) = self.sample(block) else {
            trace!("Block {} carries no fee observations", block.height);
            return;
        };

        self.window.push_back(sample);
        while self.window.len() > self.config.window_size {
            self.window.pop_front();
        }
    }

    fn is_hungry(&self) -> bool {
        self.window.len() < self.config.window_size
    }

    fn compute_recommendation(&self) -> u64 {
        let mut fee_rates: Vec<u64> = self
            .window
            .iter()
            .flat_map(|sample| sample.fee_rates.iter().copied())
            .collect();

        if fee_rates.is_empty() {
            return self.config.min_default;
        }

        fee_rates.sort_unstable();
        Self::percentile(&fee_rates, self.config.percentile)
            .clamp(self.config.min_default, self.config.max_configured)
    }

    fn window_len(&self) -> usize {
        self.window.len()
    }
}
