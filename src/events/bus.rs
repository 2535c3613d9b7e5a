//! # Event bus for diagnostics.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from many sources (channels, groups, relays, splitter loops).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Subscriber (one):
//!   SafeChannel ──┐
//!   Group       ──┼──────► Bus ───────► Diagnostics listener ────► SubscriberSet
//!   Merger      ──┤  (broadcast chan)
//!   Splitter    ──┘
//! ```
//!
//! A bus is constructed explicitly and handed to each component that should report on it;
//! there is no process-wide default.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for diagnostics events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone; clones share the sender and the sequence counter.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    seq: Arc<AtomicU64>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamps the next sequence number and publishes the event to all active subscribers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, mut ev: Event) {
        ev.seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// - Each call creates an **independent** receiver.
    /// - A receiver only gets events **sent after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

/// Publishes on an optional bus; components without diagnostics skip the event entirely.
#[inline]
pub(crate) fn emit(bus: &Option<Bus>, make: impl FnOnce() -> Event) {
    if let Some(bus) = bus {
        bus.publish(make());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_sequence_is_per_bus_and_monotonic() {
        let a = Bus::new(8);
        let b = Bus::new(8);
        let mut ra = a.subscribe();
        let mut rb = b.subscribe();

        a.publish(Event::now(EventKind::ChannelClosed));
        a.publish(Event::now(EventKind::ChannelClosed));
        b.publish(Event::now(EventKind::ChannelClosed));

        assert_eq!(ra.recv().await.unwrap().seq, 1);
        assert_eq!(ra.recv().await.unwrap().seq, 2);
        assert_eq!(rb.recv().await.unwrap().seq, 1);
    }

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(Event::now(EventKind::ShutdownRequested));
        emit(&None, || unreachable!("no bus attached"));
    }
}
