use crate::worker::OracleEvent;
use events::{Notification, NotificationListener};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Result of handing one notification to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Queued,
    /// Not a block commit
    Ignored,
    /// Queue full, notification discarded
    Dropped,
    /// Ingestion worker has stopped
    Closed,
}

/// Forwards block-commit notifications into the ingestion queue.
///
/// Runs on the notifier's thread and never waits: when the queue is full the
/// notification is dropped and counted instead.
pub struct NotificationBridge {
    sender: mpsc::Sender<OracleEvent>,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl NotificationBridge {
    pub fn new(sender: mpsc::Sender<OracleEvent>) -> Self {
        Self {
            sender,
            forwarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn forward(&self, notification: &Notification) -> ForwardOutcome {
        let Notification::BlockCommitted(summary) = notification else {
            debug!(
                "Fee oracle bridge ignoring {:?} notification",
                notification.kind()
            );
            return ForwardOutcome::Ignored;
        };

        match self.sender.try_send(OracleEvent::Block(summary.clone())) {
            Ok(()) => {
                self.forwarded.fetch_add(1, Ordering::Relaxed);
                ForwardOutcome::Queued
            }
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Fee oracle queue full, dropping block {} ({} dropped so far)",
                    summary.height(),
                    dropped
                );
                ForwardOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    "Fee oracle worker stopped, discarding block {}",
                    summary.height()
                );
                ForwardOutcome::Closed
            }
        }
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Free slots left in the ingestion queue
    pub fn remaining_capacity(&self) -> usize {
        self.sender.capacity()
    }
}

impl NotificationListener for NotificationBridge {
    fn on_event(&self, notification: &Notification) {
        self.forward(notification);
    }
}
