pub mod block;
pub mod block_store;
pub mod chain;
pub mod error;
pub mod memory;

pub use block::{Block, FeeObservation};
pub use block_store::BlockStore;
pub use chain::Ledger;
pub use error::LedgerError;
pub use memory::MemoryLedger;

// Re-exported so downstream crates agree on the hash type.
pub use bitcoin::BlockHash;
