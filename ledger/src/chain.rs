use crate::block::Block;
use crate::error::LedgerError;
use bitcoin::BlockHash;
use std::sync::Arc;

/// Read access to committed chain history.
pub trait Ledger: Send + Sync {
    /// Current best (head) block, `None` for an empty chain
    fn best_block(&self) -> Result<Option<Block>, LedgerError>;

    fn block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, LedgerError>;
}

impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn best_block(&self) -> Result<Option<Block>, LedgerError> {
        (**self).best_block()
    }

    fn block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, LedgerError> {
        (**self).block_by_hash(hash)
    }
}

/// Check that `block` may be appended on top of `tip`
pub(crate) fn check_extends(tip: Option<&Block>, block: &Block) -> Result<(), LedgerError> {
    match tip {
        None => {
            if block.height != 0 {
                return Err(LedgerError::HeightMismatch {
                    expected: 0,
                    actual: block.height,
                });
            }
        }
        Some(tip) => {
            if block.parent_hash != tip.hash {
                return Err(LedgerError::Orphan {
                    hash: block.hash,
                    height: block.height,
                    tip: tip.hash,
                });
            }
            if block.height != tip.height + 1 {
                return Err(LedgerError::HeightMismatch {
                    expected: tip.height + 1,
                    actual: block.height,
                });
            }
        }
    }
    Ok(())
}
