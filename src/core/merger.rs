//! # Merger: dynamic fan-in.
//!
//! Accepts any number of sources over its lifetime and relays their items into one
//! aggregate channel, one relay task per source.
//!
//! ## Architecture
//! ```text
//! add() ──► Writer ──► [source 1] ──► relay 1 ──┐
//! add() ──► Writer ──► [source 2] ──► relay 2 ──┼──► [aggregate] ──► aggr(): Reader
//! add() ──► Writer ──► [source N] ──► relay N ──┘
//!                                       ▲
//!                    stop: CancellationToken (fired by close)
//! ```
//!
//! ## Relay loop
//! ```text
//! loop {
//!   select { stop ─► exit(shutdown) | source item ─► forward | source closed ─► exit(drained) }
//!   forward: select { stop ─► exit(shutdown) | aggregate.write(item) }
//! }
//! on exit: close the source, run on_stop (once)
//! ```
//!
//! ## Rules
//! - per-source FIFO; no ordering across sources
//! - a slow aggregate consumer stalls every relay (no unbounded buffering)
//! - `close` = fire stop → wait for every relay → close the aggregate
//! - once stop has fired no relay forwards another item, so nothing written after shutdown
//!   reaches the aggregate

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::channels::{Reader, Recv, SafeChannel, Writer, recv_with_token};
use crate::config::Config;
use crate::error::ChannelError;
use crate::events::{Bus, Event, EventKind, emit};

/// Callback run once when a relay exits.
type OnStop = Box<dyn FnOnce() + Send + 'static>;

/// Dynamic fan-in of many sources into one aggregate.
///
/// # Example
/// ```
/// use chankit::Merger;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let merger = Merger::new();
/// let a = merger.add().unwrap();
/// let b = merger.add().unwrap();
/// let aggr = merger.aggr();
///
/// a.write(1).await;
/// b.write(2).await;
/// let mut got = vec![aggr.recv().await.unwrap(), aggr.recv().await.unwrap()];
/// got.sort();
/// assert_eq!(got, vec![1, 2]);
///
/// merger.close().await;
/// assert_eq!(aggr.recv().await, None);
/// # }
/// ```
pub struct Merger<T> {
    name: String,
    aggr: SafeChannel<T>,
    stop: CancellationToken,
    relays: TaskTracker,
    source_capacity: usize,
    next_id: AtomicU64,
    bus: Option<Bus>,
}

impl<T: Send + 'static> Default for Merger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Merger<T> {
    /// Creates a merger with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Creates a merger sized by `cfg`.
    pub fn with_config(cfg: &Config) -> Self {
        Self {
            name: "merger".to_string(),
            aggr: SafeChannel::new(cfg.capacity_clamped()),
            stop: CancellationToken::new(),
            relays: TaskTracker::new(),
            source_capacity: cfg.capacity_clamped(),
            next_id: AtomicU64::new(0),
            bus: None,
        }
    }

    /// Names the merger and reports relay lifecycle to `bus`.
    pub fn with_bus(mut self, name: impl Into<String>, bus: Bus) -> Self {
        self.name = name.into();
        self.aggr = SafeChannel::named(
            format!("{}/aggregate", self.name),
            self.aggr.capacity(),
            Some(bus.clone()),
        );
        self.bus = Some(bus);
        self
    }

    /// Registers a new source and starts its relay.
    ///
    /// The caller produces through the returned [`Writer`] and closes it to end the source.
    /// Must be called from within a tokio runtime.
    pub fn add(&self) -> Result<Writer<T>, ChannelError> {
        self.start_relay(None)
    }

    /// Like [`add`](Merger::add), running `on_stop` exactly once when the relay exits,
    /// whether the source drained or the merger shut down.
    pub fn add_with_on_stop<F>(&self, on_stop: F) -> Result<Writer<T>, ChannelError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.start_relay(Some(Box::new(on_stop)))
    }

    fn start_relay(&self, on_stop: Option<OnStop>) -> Result<Writer<T>, ChannelError> {
        if self.stop.is_cancelled() {
            return Err(ChannelError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let source_name = format!("{}/source-{id}", self.name);
        let source = SafeChannel::named(source_name.clone(), self.source_capacity, self.bus.clone());
        let relay = Relay {
            source: source.clone(),
            aggr: self.aggr.clone(),
            stop: self.stop.clone(),
            on_stop,
        };

        let bus = self.bus.clone();
        let merger = self.name.clone();
        emit(&bus, || {
            Event::now(EventKind::SourceAdded)
                .with_source(merger.as_str())
                .with_member(source_name.as_str())
        });
        self.relays.spawn(async move {
            let reason = relay.run().await;
            emit(&bus, || {
                Event::now(EventKind::SourceStopped)
                    .with_source(merger)
                    .with_member(source_name)
                    .with_reason(reason)
            });
        });

        // close may have drained the tracker between the check above and the spawn
        if self.stop.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        Ok(source.writer())
    }

    /// The single consumption point for every merged item.
    pub fn aggr(&self) -> Reader<T> {
        self.aggr.reader()
    }

    /// Returns false once `close` has been requested.
    pub fn is_open(&self) -> bool {
        !self.stop.is_cancelled()
    }

    /// Number of relays still running.
    pub fn sources(&self) -> usize {
        self.relays.len()
    }

    /// Stops every relay, waits for them, then closes the aggregate.
    ///
    /// Idempotent; every concurrent caller returns only after the aggregate is closed.
    pub async fn close(&self) {
        self.stop.cancel();
        self.relays.close();
        self.relays.wait().await;
        if self.aggr.close() {
            emit(&self.bus, || {
                Event::now(EventKind::MergerClosed).with_source(self.name.as_str())
            });
        }
    }
}

impl<T> Drop for Merger<T> {
    fn drop(&mut self) {
        self.stop.cancel();
        if self.aggr.is_open() {
            self.aggr.close();
        }
    }
}

/// One source's relay into the aggregate.
struct Relay<T> {
    source: SafeChannel<T>,
    aggr: SafeChannel<T>,
    stop: CancellationToken,
    on_stop: Option<OnStop>,
}

impl<T: Send + 'static> Relay<T> {
    /// Forwards until the source drains or stop fires; returns the exit reason.
    async fn run(mut self) -> &'static str {
        let reader = self.source.reader();
        let reason = loop {
            let item = match recv_with_token(&self.stop, &reader).await {
                Recv::Item(item) => item,
                Recv::Closed => break "drained",
                Recv::Cancelled => break "shutdown",
            };
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break "shutdown",
                _ = self.aggr.write(item) => {}
            }
        };

        self.source.close();
        if let Some(on_stop) = self.on_stop.take() {
            on_stop();
        }
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_source_item_arrives() {
        let merger = Merger::new();
        let aggr = merger.aggr();

        for v in 1..=3 {
            let w = merger.add().unwrap();
            tokio::spawn(async move {
                assert!(w.write(v).await);
            });
        }

        let mut got = Vec::new();
        for _ in 0..3 {
            let v = tokio::time::timeout(WAIT, aggr.recv()).await.unwrap().unwrap();
            got.push(v);
        }
        got.sort();
        assert_eq!(got, vec![1, 2, 3]);
        assert_eq!(aggr.try_recv(), None);

        merger.close().await;
        let fourth = tokio::time::timeout(WAIT, aggr.recv()).await.unwrap();
        assert_eq!(fourth, None);
    }

    #[tokio::test]
    async fn test_per_source_fifo() {
        let merger = Merger::with_config(&Config {
            capacity: 4,
            ..Config::default()
        });
        let aggr = merger.aggr();
        let w = merger.add().unwrap();

        let producer = tokio::spawn(async move {
            for i in 0..50 {
                assert!(w.write(i).await);
            }
            w.close();
        });

        let mut got = Vec::new();
        for _ in 0..50 {
            got.push(tokio::time::timeout(WAIT, aggr.recv()).await.unwrap().unwrap());
        }
        producer.await.unwrap();
        assert_eq!(got, (0..50).collect::<Vec<_>>());
        merger.close().await;
    }

    #[tokio::test]
    async fn test_on_stop_runs_once_on_drain_and_on_shutdown() {
        let merger = Merger::<i32>::new();
        let stops = Arc::new(AtomicUsize::new(0));

        let drained = {
            let stops = stops.clone();
            merger
                .add_with_on_stop(move || {
                    stops.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
        };
        let _idle = {
            let stops = stops.clone();
            merger
                .add_with_on_stop(move || {
                    stops.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
        };

        drained.close();
        tokio::time::timeout(WAIT, async {
            while merger.sources() > 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        merger.close().await;
        merger.close().await;
        assert_eq!(stops.load(Ordering::SeqCst), 2);
        assert_eq!(merger.sources(), 0);
    }

    #[tokio::test]
    async fn test_close_with_blocked_producer_and_no_reader() {
        let merger = Merger::new();
        let w = merger.add().unwrap();

        let producer = tokio::spawn(async move {
            let mut accepted = 0;
            for i in 0..100 {
                if !w.write(i).await {
                    break;
                }
                accepted += 1;
            }
            accepted
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(WAIT, merger.close()).await.unwrap();
        let accepted = tokio::time::timeout(WAIT, producer).await.unwrap().unwrap();
        assert!(accepted < 100);
    }

    #[tokio::test]
    async fn test_no_resurrection_after_close() {
        let merger = Merger::new();
        let aggr = merger.aggr();
        let w = merger.add().unwrap();

        merger.close().await;
        assert!(!w.is_open());
        assert!(!w.write(42).await);
        assert_eq!(aggr.recv().await, None);
        assert!(matches!(merger.add(), Err(ChannelError::Closed)));
        assert!(!merger.is_open());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_writes_racing_close_never_resurface() {
        use parking_lot::Mutex;
        use std::collections::HashSet;

        let merger = Arc::new(Merger::with_config(&Config {
            capacity: 2,
            ..Config::default()
        }));
        let aggr = merger.aggr();
        let accepted = Arc::new(Mutex::new(HashSet::new()));
        let late = Arc::new(Mutex::new(HashSet::new()));

        let mut producers = Vec::new();
        for p in 0..4u32 {
            let w = merger.add().unwrap();
            let accepted = accepted.clone();
            let late = late.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..10_000u32 {
                    let tag = (p, i);
                    let was_open = w.is_open();
                    let ok = w.write(tag).await;
                    if !was_open {
                        assert!(!ok);
                        late.lock().insert(tag);
                        break;
                    }
                    if ok {
                        accepted.lock().insert(tag);
                    }
                }
            }));
        }

        let drain = tokio::spawn(async move {
            let mut drained = Vec::new();
            while let Some(tag) = aggr.recv().await {
                drained.push(tag);
            }
            drained
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        tokio::time::timeout(WAIT, merger.close()).await.unwrap();
        for p in producers {
            tokio::time::timeout(WAIT, p).await.unwrap().unwrap();
        }
        let drained = tokio::time::timeout(WAIT, drain).await.unwrap().unwrap();

        let accepted = accepted.lock();
        let late = late.lock();
        assert!(!drained.is_empty());
        for tag in &drained {
            assert!(accepted.contains(tag), "{tag:?} was never accepted");
            assert!(!late.contains(tag), "{tag:?} was written after close");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_add_racing_close_never_returns_live_source() {
        for _ in 0..50 {
            let merger = Arc::new(Merger::<u8>::new());
            let adder = {
                let merger = merger.clone();
                tokio::spawn(async move {
                    let mut writers = Vec::new();
                    while let Ok(w) = merger.add() {
                        writers.push(w);
                        tokio::task::yield_now().await;
                    }
                    writers
                })
            };

            tokio::task::yield_now().await;
            merger.close().await;
            let writers = tokio::time::timeout(WAIT, adder).await.unwrap().unwrap();
            for w in &writers {
                assert!(!w.is_open());
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_close_callers_all_see_closed_aggregate() {
        let merger = Arc::new(Merger::<u32>::new());
        let _sources: Vec<_> = (0..4).map(|_| merger.add().unwrap()).collect();
        let aggr = merger.aggr();

        let mut closers = Vec::new();
        for _ in 0..8 {
            let merger = merger.clone();
            let aggr = aggr.clone();
            closers.push(tokio::spawn(async move {
                merger.close().await;
                assert!(!aggr.is_open());
            }));
        }
        for c in closers {
            tokio::time::timeout(WAIT, c).await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_events_reported() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let merger = Merger::<i32>::new().with_bus("ingest", bus);
        let w = merger.add().unwrap();
        w.close();
        merger.close().await;

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.source.as_deref() == Some("ingest") {
                kinds.push(ev.kind);
            }
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::SourceAdded,
                EventKind::SourceStopped,
                EventKind::MergerClosed
            ]
        );
    }
}
