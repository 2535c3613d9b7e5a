//! # SafeChannel: a bounded channel that closes exactly once.
//!
//! Wraps a bounded [`tokio::sync::mpsc`] queue with an `open` flag and a closed-signal
//! ([`CancellationToken`]). Any number of clones may write, read and close concurrently.
//!
//! ## Architecture
//! ```text
//!   write(v) ──► select! ┬─ closed.cancelled() ──► false  (never blocks past close)
//!                        └─ tx.send(v)         ──► true
//!
//!   close()  ──► open: true → false (CAS, once) ──► drop tx ──► closed.cancel()
//!
//!   recv()   ──► rx.recv(): buffered items first, then None once every sender is gone
//! ```
//!
//! ## Rules
//! - `open` only ever goes from true to false; the closed-signal fires at most once
//! - a write racing a close returns promptly, with `false` unless its enqueue won the race
//! - items buffered before the close are still delivered to readers, then `recv` yields `None`
//! - a channel built with [`Default`] is *unmade*: it reports closed and refuses writes until
//!   [`SafeChannel::make`] is called

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind, emit};

/// Queue half allocated by `make`.
struct Core<T> {
    capacity: usize,
    tx: Mutex<Option<mpsc::Sender<T>>>,
    rx: AsyncMutex<mpsc::Receiver<T>>,
}

struct Shared<T> {
    name: Cow<'static, str>,
    core: OnceLock<Core<T>>,
    open: AtomicBool,
    closed: CancellationToken,
    bus: Option<Bus>,
}

/// Bounded multi-producer, multi-consumer channel with an idempotent close.
///
/// Cloning is cheap and every clone refers to the same channel.
///
/// # Example
/// ```
/// use chankit::SafeChannel;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ch = SafeChannel::new(2);
/// assert!(ch.write(1).await);
/// assert!(ch.close());
/// assert!(!ch.close());
/// assert!(!ch.write(2).await);
///
/// assert_eq!(ch.recv().await, Some(1));
/// assert_eq!(ch.recv().await, None);
/// # }
/// ```
pub struct SafeChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SafeChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for SafeChannel<T> {
    /// An unmade channel; call [`make`](SafeChannel::make) before use.
    fn default() -> Self {
        Self::unmade("channel", None)
    }
}

impl<T> std::fmt::Debug for SafeChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeChannel")
            .field("name", &self.shared.name)
            .field("open", &self.is_open())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<T> SafeChannel<T> {
    /// Creates and makes a channel with the given buffer size (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self::named("channel", capacity, None)
    }

    /// Creates and makes a named channel that reports to `bus`.
    pub fn named(name: impl Into<Cow<'static, str>>, capacity: usize, bus: Option<Bus>) -> Self {
        let ch = Self::unmade(name, bus);
        ch.make(capacity);
        ch
    }

    fn unmade(name: impl Into<Cow<'static, str>>, bus: Option<Bus>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                core: OnceLock::new(),
                open: AtomicBool::new(false),
                closed: CancellationToken::new(),
                bus,
            }),
        }
    }

    /// Allocates the buffer and opens the channel.
    ///
    /// Only the first call has an effect; later calls (including after a close) are no-ops.
    pub fn make(&self, capacity: usize) {
        let mut made = false;
        self.shared.core.get_or_init(|| {
            made = true;
            let capacity = capacity.max(1);
            let (tx, rx) = mpsc::channel(capacity);
            Core {
                capacity,
                tx: Mutex::new(Some(tx)),
                rx: AsyncMutex::new(rx),
            }
        });
        if made && !self.shared.closed.is_cancelled() {
            self.shared.open.store(true, Ordering::Release);
        }
    }

    /// Channel name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Non-blocking state query.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Buffer size, or 0 for an unmade channel.
    pub fn capacity(&self) -> usize {
        self.shared.core.get().map_or(0, |core| core.capacity)
    }

    /// Enqueues `value`, waiting for buffer space.
    ///
    /// Returns `false` without waiting further as soon as the channel is (or becomes) closed.
    pub async fn write(&self, value: T) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        let closed = &self.shared.closed;

        let sent = tokio::select! {
            biased;
            _ = closed.cancelled() => false,
            res = tx.send(value) => res.is_ok(),
        };
        if !sent {
            self.reject("closed");
        }
        sent
    }

    /// Enqueues `value` only if buffer space is available right now.
    pub fn try_write(&self, value: T) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        if self.shared.closed.is_cancelled() {
            self.reject("closed");
            return false;
        }
        tx.try_send(value).is_ok()
    }

    /// Receives the next item.
    ///
    /// Buffered items are delivered even after close; `None` means closed and drained.
    /// An unmade channel yields `None` immediately.
    pub async fn recv(&self) -> Option<T> {
        let core = self.shared.core.get()?;
        let mut rx = core.rx.lock().await;
        rx.recv().await
    }

    /// Receives an item only if one is ready and no other reader holds the queue.
    pub fn try_recv(&self) -> Option<T> {
        let core = self.shared.core.get()?;
        let mut rx = core.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Closes the channel.
    ///
    /// Safe to call any number of times from any number of tasks: exactly one call
    /// performs the close and returns `true`; every other call returns `false`.
    pub fn close(&self) -> bool {
        let shared = &self.shared;
        if shared
            .open
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            emit(&shared.bus, || {
                Event::now(EventKind::CloseIgnored).with_source(shared.name.as_ref())
            });
            return false;
        }

        if let Some(core) = shared.core.get() {
            core.tx.lock().take();
        }
        shared.closed.cancel();
        emit(&shared.bus, || {
            Event::now(EventKind::ChannelClosed).with_source(shared.name.as_ref())
        });
        true
    }

    /// Returns the closed-signal, for composing with other cancellation sources.
    ///
    /// The returned token is cancelled exactly when the channel closes. It is a child of the
    /// internal signal, so cancelling it from the outside has no effect on the channel.
    pub fn closed_token(&self) -> CancellationToken {
        self.shared.closed.child_token()
    }

    /// Waits until the channel is closed.
    pub async fn closed(&self) {
        self.shared.closed.cancelled().await
    }

    fn sender(&self) -> Option<mpsc::Sender<T>> {
        let Some(core) = self.shared.core.get() else {
            self.reject("unmade");
            return None;
        };
        let tx = core.tx.lock().clone();
        if tx.is_none() {
            self.reject("closed");
        }
        tx
    }

    fn reject(&self, reason: &'static str) {
        emit(&self.shared.bus, || {
            Event::now(EventKind::WriteRejected)
                .with_source(self.shared.name.as_ref())
                .with_reason(reason)
        });
    }
}
