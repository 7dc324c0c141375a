use crate::error::{OracleError, Result};
use crate::strategy::PriceStrategy;
use ledger::{Ledger, LedgerError};
use tracing::{debug, info, warn};

/// Why the startup traversal stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The ledger has no blocks
    EmptyLedger,
    /// The strategy has enough history
    Satisfied,
    /// The traversal limit was hit while the strategy was still hungry
    LimitReached,
    /// Genesis was processed while the strategy was still hungry
    ReachedGenesis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub outcome: BootstrapOutcome,
    pub visited: usize,
    pub head_height: Option<u64>,
    pub lowest_height: Option<u64>,
}

impl BootstrapReport {
    pub fn is_satisfied(&self) -> bool {
        self.outcome == BootstrapOutcome::Satisfied
    }
}

/// Seed `strategy` by walking the ledger backward from its head.
///
/// Stops once the strategy is no longer hungry, after `limit` blocks, or after
/// processing genesis, whichever comes first. A parent the ledger cannot
/// produce means the ledger is inconsistent and is returned as an error.
pub fn bootstrap<L, S>(ledger: &L, strategy: &mut S, limit: usize) -> Result<BootstrapReport>
where
    L: Ledger + ?Sized,
    S: PriceStrategy + ?Sized,
{
    let Some(mut block) = ledger.best_block()? else {
        info!("Ledger is empty, fee oracle starts from its default price");
        return Ok(BootstrapReport {
            outcome: BootstrapOutcome::EmptyLedger,
            visited: 0,
            head_height: None,
            lowest_height: None,
        });
    };

    let head_height = block.height;
    if limit == 0 {
        warn!("Fee oracle bootstrap disabled, starting from its default price");
        return Ok(BootstrapReport {
            outcome: BootstrapOutcome::LimitReached,
            visited: 0,
            head_height: Some(head_height),
            lowest_height: None,
        });
    }

    let mut visited = 0usize;
    let outcome = loop {
        strategy.process_block(&block);
        visited += 1;

        if !strategy.is_hungry() {
            break BootstrapOutcome::Satisfied;
        }
        if block.is_genesis() {
            break BootstrapOutcome::ReachedGenesis;
        }
        if visited >= limit {
            break BootstrapOutcome::LimitReached;
        }

        let parent_hash = block.parent_hash;
        let parent = ledger
            .block_by_hash(&parent_hash)?
            .ok_or(OracleError::MissingParent {
                height: block.height,
                parent: parent_hash,
            })?;
        if parent.height + 1 != block.height {
            return Err(LedgerError::HeightMismatch {
                expected: block.height - 1,
                actual: parent.height,
            }
            .into());
        }

        debug!("Bootstrap stepping back to block {}", parent.height);
        block = parent;
    };

    // `block` is the last one processed
    let lowest_height = block.height;
    match outcome {
        BootstrapOutcome::Satisfied => info!(
            "Fee oracle warmed up from {} blocks (heights {}..={})",
            visited, lowest_height, head_height
        ),
        _ => warn!(
            "Fee oracle bootstrap stopped ({:?}) after {} blocks with limited data",
            outcome, visited
        ),
    }

    Ok(BootstrapReport {
        outcome,
        visited,
        head_height: Some(head_height),
        lowest_height: Some(lowest_height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SampleMode;
    use crate::strategy::{BlockPriceStrategy, StrategyConfig};
    use ledger::{Block, MemoryLedger};

    fn strategy(window_size: usize) -> BlockPriceStrategy {
        BlockPriceStrategy::new(StrategyConfig {
            min_default: 1,
            max_configured: 1_000_000,
            window_size,
            percentile: 60,
            sample_mode: SampleMode::AllObservations,
        })
        .unwrap()
    }

    /// Genesis plus `len` blocks; `fees(height)` gives each block's fee rates
    fn build_ledger(len: u64, fees: impl Fn(u64) -> Vec<u64>) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        let mut parent = Block::genesis(0);
        ledger.append(parent.clone()).unwrap();
        for height in 1..=len {
            let block = Block::child_of(&parent, height * 10, fees(height));
            ledger.append(block.clone()).unwrap();
            parent = block;
        }
        ledger
    }

    #[test]
    fn test_empty_ledger() {
        let mut strategy = strategy(5);
        let report = bootstrap(&MemoryLedger::new(), &mut strategy, 128).unwrap();

        assert_eq!(report.outcome, BootstrapOutcome::EmptyLedger);
        assert_eq!(report.visited, 0);
        assert_eq!(strategy.blocks_seen(), 0);
    }

    #[test]
    fn test_stops_when_satisfied() {
        let ledger = build_ledger(50, |h| vec![h * 100]);
        let mut strategy = strategy(5);
        let report = bootstrap(&ledger, &mut strategy, 128).unwrap();

        assert!(report.is_satisfied());
        assert_eq!(report.visited, 5);
        assert_eq!(report.head_height, Some(50));
        assert_eq!(report.lowest_height, Some(46));
        assert_eq!(strategy.window_heights(), vec![50, 49, 48, 47, 46]);
    }

    #[test]
    fn test_stops_at_limit() {
        // Empty blocks never satisfy the strategy
        let ledger = build_ledger(300, |_| Vec::new());
        let mut strategy = strategy(5);
        let report = bootstrap(&ledger, &mut strategy, 128).unwrap();

        assert_eq!(report.outcome, BootstrapOutcome::LimitReached);
        assert_eq!(report.visited, 128);
        assert_eq!(strategy.blocks_seen(), 128);
        assert_eq!(report.lowest_height, Some(300 - 127));
    }

    #[test]
    fn test_short_ledger_stops_at_genesis() {
        let ledger = build_ledger(3, |h| vec![h]);
        let mut strategy = strategy(20);
        let report = bootstrap(&ledger, &mut strategy, 128).unwrap();

        assert_eq!(report.outcome, BootstrapOutcome::ReachedGenesis);
        assert_eq!(report.visited, 4);
        assert_eq!(report.lowest_height, Some(0));
    }

    #[test]
    fn test_zero_limit_visits_nothing() {
        let ledger = build_ledger(3, |h| vec![h]);
        let mut strategy = strategy(2);
        let report = bootstrap(&ledger, &mut strategy, 0).unwrap();

        assert_eq!(report.outcome, BootstrapOutcome::LimitReached);
        assert_eq!(report.visited, 0);
        assert_eq!(report.head_height, Some(3));
    }

    struct HeadOnly(Block);

    impl Ledger for HeadOnly {
        fn best_block(&self) -> std::result::Result<Option<Block>, LedgerError> {
            Ok(Some(self.0.clone()))
        }

        fn block_by_hash(
            &self,
            _hash: &ledger::BlockHash,
        ) -> std::result::Result<Option<Block>, LedgerError> {
            Ok(None)
        }
    }

    #[test]
    fn test_missing_parent_is_fatal() {
        let genesis = Block::genesis(0);
        let head = Block::child_of(&genesis, 10, [5]);
        let mut strategy = strategy(4);

        let err = bootstrap(&HeadOnly(head), &mut strategy, 128).unwrap_err();
        assert!(matches!(
            err,
            OracleError::MissingParent { height: 1, parent } if parent == genesis.hash
        ));
    }
}
