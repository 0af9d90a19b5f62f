//! Market event fan-out.
//!
//! [`EventBroadcaster`] publishes trades and book deltas to any number of
//! subscribers over a bounded broadcast channel. Publishing never blocks and
//! never fails the caller: a subscriber that falls behind observes
//! [`RecvError::Lagged`] on its receiver and must resync from a snapshot
//! instead of stalling matching.
//!
//! [`RecvError::Lagged`]: tokio::sync::broadcast::error::RecvError::Lagged

use crate::execution::{BookDelta, TradeExecution};
use log::debug;
use tokio::sync::broadcast;

/// Event published after each mutating engine call: trades first, then one
/// delta per touched price level reflecting post-trade state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MarketEvent {
    Trade(TradeExecution),
    BookDelta(BookDelta),
}

/// Fan-out of engine events to subscribers.
///
/// Subscribe by obtaining a receiver; unsubscribe by dropping it. Cloning
/// shares the same channel.
#[derive(Clone, Debug)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<MarketEvent>,
    capacity: usize,
}

impl EventBroadcaster {
    /// Creates a broadcaster whose subscribers each buffer up to `capacity`
    /// events before they start lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish to all current subscribers. With no subscribers this is a
    /// no-op; a full subscriber queue loses its oldest events rather than
    /// blocking the engine.
    pub fn publish(&self, event: MarketEvent) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        debug!("publishing {:?}", event);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
