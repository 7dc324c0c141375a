use crate::block::Block;
use crate::chain::{check_extends, Ledger};
use crate::error::LedgerError;
use bitcoin::BlockHash;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryChain {
    blocks: HashMap<BlockHash, Block>,
    tip: Option<BlockHash>,
}

/// In-memory linear chain
#[derive(Debug, Default)]
pub struct MemoryLedger {
    chain: RwLock<MemoryChain>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from consecutive blocks, genesis first
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Result<Self, LedgerError> {
        let ledger = Self::new();
        for block in blocks {
            ledger.append(block)?;
        }
        Ok(ledger)
    }

    /// Append a block on top of the current tip
    pub fn append(&self, block: Block) -> Result<(), LedgerError> {
        let mut chain = self.chain.write();
        let tip = chain.tip.and_then(|hash| chain.blocks.get(&hash));
        check_extends(tip, &block)?;

        debug!("Appending block {} at height {}", block.hash, block.height);
        chain.tip = Some(block.hash);
        chain.blocks.insert(block.hash, block);
        Ok(())
    }

    pub fn tip(&self) -> Option<Block> {
        let chain = self.chain.read();
        chain.tip.and_then(|hash| chain.blocks.get(&hash).cloned())
    }

    pub fn height(&self) -> Option<u64> {
        self.tip().map(|block| block.height)
    }

    pub fn len(&self) -> usize {
        self.chain.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ledger for MemoryLedger {
    fn best_block(&self) -> Result<Option<Block>, LedgerError> {
        Ok(self.tip())
    }

    fn block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, LedgerError> {
        Ok(self.chain.read().blocks.get(hash).cloned())
    }
}
