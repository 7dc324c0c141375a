use bitcoin::BlockHash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Block {hash} at height {height} does not extend tip {tip}")]
    Orphan {
        hash: BlockHash,
        height: u64,
        tip: BlockHash,
    },

    #[error("Height mismatch: expected {expected}, got {actual}")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("Corrupted record: {0}")]
    Corrupted(String),
}
