//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] and owns the sequence counter of
//! the runtime it belongs to.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Consumers:
//!   ServiceActor ──┐
//!   Tree         ──┼──► Bus (stamp seq) ──► fan-out listener ──► SubscriberSet
//!   Coordinator  ──┘                   └──► any bus.subscribe() receiver
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits.
//! - **Bounded capacity**: slow receivers get `RecvError::Lagged(n)` and skip `n` events.
//! - **No persistence**: events sent with no receiver are dropped.
//! - **Ordering**: `seq` strictly increases per bus, in publish order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; clones share the channel and the sequence counter.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    seq: Arc<AtomicU64>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamps the next sequence number onto `ev` and broadcasts it.
    ///
    /// Returns the assigned sequence number.
    pub fn publish(&self, mut ev: Event) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        ev.seq = seq;
        let _ = self.tx.send(ev);
        seq
    }

    /// Creates a receiver observing events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn stamps_increasing_sequence() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(Event::new(EventKind::ShutdownRequested));
        bus.publish(Event::new(EventKind::AllStoppedWithin));

        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        assert_eq!(b.kind, EventKind::AllStoppedWithin);
    }

    #[test]
    fn publish_without_receivers_is_fine() {
        let bus = Bus::new(0);
        assert_eq!(bus.publish(Event::new(EventKind::GraceExceeded)), 1);
    }
}
