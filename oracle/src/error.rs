use ledger::{BlockHash, LedgerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Ledger is missing parent {parent} of block at height {height}")]
    MissingParent { height: u64, parent: BlockHash },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Ingestion worker failed: {0}")]
    WorkerJoin(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;
