use crate::notification::Notification;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Receives notifications on the publisher's thread.
///
/// Implementations must return quickly: the publisher is blocked until every
/// listener of the handler has returned.
pub trait NotificationListener: Send + Sync {
    fn on_event(&self, notification: &Notification);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKind {
    Block,
    Transaction,
    Consensus,
}

type ListenerMap = RwLock<BTreeMap<u64, Arc<dyn NotificationListener>>>;

/// Dispatcher for one kind of notification
pub struct EventHandler {
    kind: HandlerKind,
    listeners: Arc<ListenerMap>,
    next_id: AtomicU64,
}

impl EventHandler {
    pub fn new(kind: HandlerKind) -> Self {
        Self {
            kind,
            listeners: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Attach a listener; it stays attached until the returned guard is dropped
    pub fn subscribe(&self, listener: Arc<dyn NotificationListener>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().insert(id, listener);
        debug!("Listener {} subscribed to {:?} handler", id, self.kind);

        Subscription {
            id,
            kind: self.kind,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver `notification` to every listener, returning how many were called
    pub fn publish(&self, notification: &Notification) -> usize {
        if notification.kind().handler_kind() != self.kind {
            debug!(
                "{:?} handler ignoring {:?} notification",
                self.kind,
                notification.kind()
            );
            return 0;
        }

        // Snapshot so listeners may (un)subscribe while being notified
        let listeners: Vec<_> = self.listeners.read().values().cloned().collect();
        for listener in &listeners {
            listener.on_event(notification);
        }

        trace!(
            "Published {:?} to {} listeners",
            notification.kind(),
            listeners.len()
        );
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Detaches its listener when dropped
pub struct Subscription {
    id: u64,
    kind: HandlerKind,
    listeners: Weak<ListenerMap>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.listeners
            .upgrade()
            .map(|listeners| listeners.read().contains_key(&self.id))
            .unwrap_or(false)
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if listeners.write().remove(&self.id).is_some() {
                debug!("Listener {} unsubscribed from {:?} handler", self.id, self.kind);
            }
        }
    }
}

/// One handler per [`HandlerKind`], routing by notification kind
pub struct EventManager {
    handlers: BTreeMap<HandlerKind, Arc<EventHandler>>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    pub fn new() -> Self {
        let handlers = [
            HandlerKind::Block,
            HandlerKind::Transaction,
            HandlerKind::Consensus,
        ]
        .into_iter()
        .map(|kind| (kind, Arc::new(EventHandler::new(kind))))
        .collect();

        Self { handlers }
    }

    pub fn handler(&self, kind: HandlerKind) -> Arc<EventHandler> {
        Arc::clone(&self.handlers[&kind])
    }

    pub fn publish(&self, notification: &Notification) -> usize {
        self.handlers[&notification.kind().handler_kind()].publish(notification)
    }
}
