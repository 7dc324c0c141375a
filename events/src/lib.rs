//! Chain notification dispatch.
//!
//! Producers publish [`Notification`]s through an [`EventManager`]; each
//! notification is routed to the [`EventHandler`] of its kind, which invokes
//! every subscribed [`NotificationListener`] inline on the publisher's thread.

pub mod handler;
pub mod notification;

pub use handler::{EventHandler, EventManager, HandlerKind, NotificationListener, Subscription};
pub use notification::{BlockSummary, Notification, NotificationKind};
