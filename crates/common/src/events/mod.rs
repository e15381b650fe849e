//! Realtime table-change events
//!
//! Clients subscribe to a table by name and receive change notifications
//! until they close the subscription. Subscriptions are explicit values:
//! closing or dropping one is the teardown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// A change to one row of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEvent {
    pub table: String,
    pub action: ChangeAction,
    pub record_id: Uuid,
    pub at: DateTime<Utc>,
}

impl TableEvent {
    pub fn new(table: impl Into<String>, action: ChangeAction, record_id: Uuid) -> Self {
        Self {
            table: table.into(),
            action,
            record_id,
            at: Utc::now(),
        }
    }
}

/// Fan-out of table events to live subscriptions
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TableEvent>,
    live: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event; returns how many subscriptions were listening
    pub fn publish(&self, event: TableEvent) -> usize {
        crate::metrics::record_event_published(&event.table);

        match self.sender.send(event) {
            Ok(receivers) => receivers,
            // No subscribers is not an error
            Err(_) => 0,
        }
    }

    /// Open a subscription for one table
    pub fn subscribe(&self, table: impl Into<String>) -> Subscription {
        let table = table.into();
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        crate::metrics::set_live_subscriptions(live);
        debug!(table = %table, live, "Subscription opened");

        Subscription {
            table,
            receiver: self.sender.subscribe(),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of subscriptions not yet closed
    pub fn live_subscriptions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Receives events for a single table until closed
pub struct Subscription {
    table: String,
    receiver: broadcast::Receiver<TableEvent>,
    live: Arc<AtomicUsize>,
}

impl Subscription {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Wait for the next event on this table.
    ///
    /// Returns `None` once the bus is gone. Events lost to lag are skipped.
    pub async fn recv(&mut self) -> Option<TableEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.table == self.table => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(table = %self.table, skipped, "Subscriber lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Tear the subscription down
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let live = self.live.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        crate::metrics::set_live_subscriptions(live);
        debug!(table = %self.table, live, "Subscription closed");
    }
}
