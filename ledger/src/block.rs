use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::BlockHash;
use serde::{Deserialize, Serialize};

/// Per-unit price paid by a single included transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeeObservation {
    pub fee_rate: u64,
}

impl FeeObservation {
    pub fn new(fee_rate: u64) -> Self {
        Self { fee_rate }
    }
}

/// A committed block as seen by fee consumers.
///
/// Only the fields needed to walk the chain and read transaction prices are
/// carried; execution data stays with the ledger that produced the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
    pub timestamp: u64,
    pub observations: Vec<FeeObservation>,
}

impl Block {
    /// Build the genesis block (height 0, all-zero parent)
    pub fn genesis(timestamp: u64) -> Self {
        Self::assemble(0, BlockHash::all_zeros(), timestamp, Vec::new())
    }

    /// Build the block extending `parent` with the given transaction fee rates
    pub fn child_of(
        parent: &Block,
        timestamp: u64,
        fee_rates: impl IntoIterator<Item = u64>,
    ) -> Self {
        let observations = fee_rates.into_iter().map(FeeObservation::new).collect();
        Self::assemble(parent.height + 1, parent.hash, timestamp, observations)
    }

    fn assemble(
        height: u64,
        parent_hash: BlockHash,
        timestamp: u64,
        observations: Vec<FeeObservation>,
    ) -> Self {
        let hash = Self::compute_hash(height, &parent_hash, timestamp, &observations);
        Self {
            height,
            hash,
            parent_hash,
            timestamp,
            observations,
        }
    }

    /// Double-SHA256 over the header fields and every observation
    pub fn compute_hash(
        height: u64,
        parent_hash: &BlockHash,
        timestamp: u64,
        observations: &[FeeObservation],
    ) -> BlockHash {
        let mut engine = BlockHash::engine();
        engine.input(&height.to_le_bytes());
        engine.input(&parent_hash.to_byte_array());
        engine.input(&timestamp.to_le_bytes());
        for observation in observations {
            engine.input(&observation.fee_rate.to_le_bytes());
        }
        BlockHash::from_engine(engine)
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    pub fn tx_count(&self) -> usize {
        self.observations.len()
    }

    pub fn fee_rates(&self) -> impl Iterator<Item = u64> + '_ {
        self.observations.iter().map(|o| o.fee_rate)
    }

    /// Cheapest price that still made it into this block
    pub fn min_fee_rate(&self) -> Option<u64> {
        self.fee_rates().min()
    }

    pub fn total_fees(&self) -> u64 {
        self.fee_rates().fold(0u64, |acc, rate| acc.saturating_add(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_links_to_parent() {
        let genesis = Block::genesis(1_600_000_000);
        let child = Block::child_of(&genesis, 1_600_000_010, [30, 10, 20]);

        assert!(genesis.is_genesis());
        assert_eq!(genesis.parent_hash, BlockHash::all_zeros());
        assert_eq!(child.height, 1);
        assert_eq!(child.parent_hash, genesis.hash);
        assert_eq!(child.tx_count(), 3);
        assert_eq!(child.min_fee_rate(), Some(10));
        assert_eq!(child.total_fees(), 60);
    }

    #[test]
    fn test_hash_covers_observations() {
        let genesis = Block::genesis(0);
        let a = Block::child_of(&genesis, 10, [1, 2]);
        let b = Block::child_of(&genesis, 10, [1, 3]);

        assert_ne!(a.hash, b.hash);
        assert_eq!(
            a.hash,
            Block::compute_hash(a.height, &a.parent_hash, a.timestamp, &a.observations)
        );
    }

    #[test]
    fn test_empty_block_has_no_minimum() {
        let genesis = Block::genesis(0);
        assert_eq!(genesis.min_fee_rate(), None);
        assert_eq!(genesis.total_fees(), 0);
    }
}
