use crate::oracle::SharedState;
use events::BlockSummary;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Entry of the ingestion queue
#[derive(Debug, Clone)]
pub enum OracleEvent {
    Block(Arc<BlockSummary>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopped,
}

/// Single consumer applying queued blocks to the price strategy in order
pub struct IngestionWorker {
    receiver: mpsc::Receiver<OracleEvent>,
    state: SharedState,
    status: WorkerState,
}

impl IngestionWorker {
    pub(crate) fn new(receiver: mpsc::Receiver<OracleEvent>, state: SharedState) -> Self {
        Self {
            receiver,
            state,
            status: WorkerState::Running,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<WorkerState> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> WorkerState {
        info!("Starting fee oracle ingestion worker");

        while self.status == WorkerState::Running {
            match self.receiver.recv().await {
                Some(event) => self.handle(event),
                None => {
                    info!("Fee oracle queue closed");
                    self.status = WorkerState::Stopped;
                }
            }
        }

        info!(
            "Fee oracle ingestion worker stopped, abandoning {} queued events",
            self.receiver.len()
        );
        self.status
    }

    fn handle(&mut self, event: OracleEvent) {
        match event {
            OracleEvent::Block(summary) => {
                trace!("Fee oracle queue depth {}", self.receiver.len());

                let mut state = self.state.lock();
                state.strategy.process_block(&summary.block);
                state.cache.mark_ingested();
                state.blocks_ingested += 1;

                debug!(
                    "Fee oracle ingested block {} ({} transactions)",
                    summary.height(),
                    summary.block.tx_count()
                );
            }
            OracleEvent::Shutdown => {
                debug!("Fee oracle received shutdown");
                self.status = WorkerState::Stopped;
            }
        }
    }
}
