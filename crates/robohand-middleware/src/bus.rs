//! In-process broadcast of [`StateUpdate`]s to dashboard observers.
//!
//! Uses a [`tokio::sync::broadcast`] channel so that every subscriber
//! receives every update and no subscriber can hold up a producer: a slow
//! observer only loses the oldest buffered updates (reported as `Lagged`).
//! Publishing is a plain synchronous call, so blocking producer threads can
//! publish without a runtime.

use robohand_types::StateUpdate;
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default channel capacity (number of buffered updates before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// Shared update bus.  Clone it cheaply – all clones share one channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<StateUpdate>,
}

impl EventBus {
    /// Create a new bus buffering at most `capacity` updates per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish `update` to every current subscriber.
    ///
    /// Returns the number of subscribers that were handed the update.  Having
    /// no subscribers is normal and returns `0`.
    pub fn publish(&self, update: StateUpdate) -> usize {
        match self.sender.send(update) {
            Ok(n) => n,
            Err(broadcast::error::SendError(_)) => {
                trace!(fingers = %update.fingers, "update published with no observers");
                0
            }
        }
    }

    /// Subscribe to every update published from now on.
    pub fn subscribe(&self) -> UpdateSubscriber {
        UpdateSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiving end of the [`EventBus`] for one observer.
pub struct UpdateSubscriber {
    receiver: broadcast::Receiver<StateUpdate>,
}

impl UpdateSubscriber {
    /// Wait for the next update.
    ///
    /// Skips over updates dropped because this subscriber fell behind.
    /// Returns `None` when the bus is closed and no further updates will
    /// arrive.
    pub async fn recv(&mut self) -> Option<StateUpdate> {
        loop {
            match self.receiver.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "update subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Return an already-buffered update without waiting.
    pub fn try_recv(&mut self) -> Option<StateUpdate> {
        loop {
            match self.receiver.try_recv() {
                Ok(update) => return Some(update),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
