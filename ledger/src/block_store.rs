use crate::block::Block;
use crate::chain::{check_extends, Ledger};
use crate::error::LedgerError;
use bitcoin::hashes::Hash;
use bitcoin::BlockHash;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, Transactional,
    TransactionalTree,
};
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

const TIP_KEY: &[u8] = b"tip";

/// sled-backed chain storage
pub struct BlockStore {
    db: Db,
    blocks_tree: Tree,  // BlockHash -> Block
    height_index: Tree, // Height -> BlockHash
    meta_tree: Tree,    // Tip pointer
}

impl BlockStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        info!("Opening block store at {:?}", path);
        // Flushed explicitly by callers, no background flusher
        let db = sled::Config::new()
            .path(path)
            .flush_every_ms(None)
            .open()?;
        Self::with_db(db)
    }

    pub fn with_db(db: Db) -> Result<Self, LedgerError> {
        Ok(Self {
            blocks_tree: db.open_tree("blocks")?,
            height_index: db.open_tree("height_index")?,
            meta_tree: db.open_tree("meta")?,
            db,
        })
    }

    /// Store a block on top of the current tip.
    ///
    /// The tip check and the block, height and tip records commit as one
    /// transaction, so concurrent writers cannot both extend the same tip.
    pub fn store(&self, block: &Block) -> Result<(), LedgerError> {
        let hash_key = block.hash.to_byte_array();
        let height_key = block.height.to_be_bytes();
        let data = bincode::serialize(block)?;

        let result = (&self.blocks_tree, &self.height_index, &self.meta_tree).transaction(
            |(blocks, heights, meta)| -> ConflictableTransactionResult<(), LedgerError> {
                let tip = Self::tx_tip(blocks, meta)?;
                check_extends(tip.as_ref(), block).map_err(ConflictableTransactionError::Abort)?;

                blocks.insert(&hash_key[..], data.clone())?;
                heights.insert(&height_key[..], &hash_key[..])?;
                meta.insert(TIP_KEY, &hash_key[..])?;
                Ok(())
            },
        );

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        }

        debug!(
            "Stored block {} at height {} with {} transactions",
            block.hash,
            block.height,
            block.tx_count()
        );
        Ok(())
    }

    pub fn get(&self, hash: &BlockHash) -> Result<Option<Block>, LedgerError> {
        match self.blocks_tree.get(hash.to_byte_array())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    pub fn get_by_height(&self, height: u64) -> Result<Option<Block>, LedgerError> {
        match self.height_index.get(height.to_be_bytes())? {
            Some(hash_bytes) => self.get(&Self::decode_hash(&hash_bytes)?),
            None => Ok(None),
        }
    }

    pub fn tip(&self) -> Result<Option<Block>, LedgerError> {
        match self.meta_tree.get(TIP_KEY)? {
            Some(hash_bytes) => {
                let hash = Self::decode_hash(&hash_bytes)?;
                let block = self
                    .get(&hash)?
                    .ok_or_else(|| LedgerError::Corrupted(format!("tip {} has no block", hash)))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// Tip as seen inside a `store` transaction
    fn tx_tip(
        blocks: &TransactionalTree,
        meta: &TransactionalTree,
    ) -> ConflictableTransactionResult<Option<Block>, LedgerError> {
        let Some(hash_bytes) = meta.get(TIP_KEY)? else {
            return Ok(None);
        };
        let hash = Self::decode_hash(&hash_bytes).map_err(ConflictableTransactionError::Abort)?;
        let data = blocks.get(hash.to_byte_array())?.ok_or_else(|| {
            ConflictableTransactionError::Abort(LedgerError::Corrupted(format!(
                "tip {} has no block",
                hash
            )))
        })?;
        let block = bincode::deserialize(&data)
            .map_err(|e| ConflictableTransactionError::Abort(LedgerError::from(e)))?;
        Ok(Some(block))
    }

    pub fn len(&self) -> usize {
        self.blocks_tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks_tree.is_empty()
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        self.db.flush()?;
        Ok(())
    }

    fn decode_hash(bytes: &[u8]) -> Result<BlockHash, LedgerError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LedgerError::Corrupted(format!("bad hash length {}", bytes.len())))?;
        Ok(BlockHash::from_byte_array(array))
    }
}

impl Ledger for BlockStore {
    fn best_block(&self) -> Result<Option<Block>, LedgerError> {
        self.tip()
    }

    fn block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, LedgerError> {
        self.get(hash)
    }
}
