use crate::handler::HandlerKind;
use ledger::{Block, BlockHash};
use std::sync::Arc;

/// Payload of a block-commit notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub block: Block,
    pub total_fees: u64,
}

impl BlockSummary {
    pub fn new(block: Block) -> Self {
        let total_fees = block.total_fees();
        Self { block, total_fees }
    }

    pub fn height(&self) -> u64 {
        self.block.height
    }

    pub fn hash(&self) -> BlockHash {
        self.block.hash
    }
}

/// Type discriminator for [`Notification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    BlockCommitted,
    TransactionReceived,
    ConsensusChanged,
}

impl NotificationKind {
    /// Handler responsible for delivering this kind
    pub fn handler_kind(self) -> HandlerKind {
        match self {
            NotificationKind::BlockCommitted => HandlerKind::Block,
            NotificationKind::TransactionReceived => HandlerKind::Transaction,
            NotificationKind::ConsensusChanged => HandlerKind::Consensus,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Notification {
    BlockCommitted(Arc<BlockSummary>),
    TransactionReceived { fee_rate: u64 },
    ConsensusChanged { height: u64 },
}

impl Notification {
    pub fn block_committed(block: Block) -> Self {
        Notification::BlockCommitted(Arc::new(BlockSummary::new(block)))
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::BlockCommitted(_) => NotificationKind::BlockCommitted,
            Notification::TransactionReceived { .. } => NotificationKind::TransactionReceived,
            Notification::ConsensusChanged { .. } => NotificationKind::ConsensusChanged,
        }
    }
}
