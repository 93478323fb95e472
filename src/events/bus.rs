//! # Event bus for broadcasting pool events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. The supervisor control loop is the
//! main publisher; subscriber workers publish overflow/panic notices.
//!
//! ```text
//! control loop ──┐
//!                ├──► Bus ──► fan-out listener ──► SubscriberSet
//! subscribers  ──┘        └─► PoolHandle::subscribe() receivers
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - One ring buffer of `capacity` events is shared by all receivers.
//! - Slow receivers observe `RecvError::Lagged(n)` and skip the `n` oldest events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for pool events.
///
/// Cheap to clone (holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_only_see_later_events() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ReloadRequested));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ReloadCompleted));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ReloadCompleted);
        assert!(rx.try_recv().is_err());
    }
}
