//! # Diagnostics runtime.
//!
//! Wires a [`Bus`] to a [`SubscriberSet`] through one listener task. Components get a clone
//! of the bus via their `with_bus` constructors; subscribers see everything they publish.
//!
//! ```text
//! SafeChannel / Group / Merger / Splitter ── publish ──► Bus
//!                                                         │
//!                                       listener: rx.recv() ─► SubscriberSet::emit(&Event)
//!                                                                  │
//!                                                   [queue] ─► worker ─► sub.on_event()
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use chankit::{Config, Diagnostics, LogWriter, SafeChannel, Subscribe};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let diag = Diagnostics::builder(Config::default())
//!     .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
//!     .build();
//!
//! let ch = SafeChannel::<u32>::named("jobs", 8, Some(diag.bus()));
//! ch.close();
//!
//! diag.shutdown().await;
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`Diagnostics`].
pub struct DiagnosticsBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl DiagnosticsBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets the subscribers fed by the listener.
    ///
    /// Each one gets a dedicated worker with its own bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Creates the bus, spawns subscriber workers and the listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Diagnostics {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let set = SubscriberSet::new(self.subscribers, bus.clone());
        let stop = CancellationToken::new();

        let mut rx = bus.subscribe();
        let token = stop.clone();
        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            // flush what was published before the stop request
            while let Ok(ev) = rx.try_recv() {
                set.emit(&ev);
            }
            set.shutdown().await;
        });

        Diagnostics {
            bus,
            stop,
            listener,
        }
    }
}

/// Running diagnostics pipeline: a bus plus the subscribers listening on it.
pub struct Diagnostics {
    bus: Bus,
    stop: CancellationToken,
    listener: JoinHandle<()>,
}

impl Diagnostics {
    pub fn builder(cfg: Config) -> DiagnosticsBuilder {
        DiagnosticsBuilder::new(cfg)
    }

    /// A handle for publishers.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Stops the listener, lets every subscriber drain its queue, then returns.
    pub async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.listener.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::SafeChannel;
    use crate::events::{Event, EventKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "collect"
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_component_events() {
        let collect = Arc::new(Collect::default());
        let diag = Diagnostics::builder(Config::default())
            .with_subscribers(vec![collect.clone() as Arc<dyn Subscribe>])
            .build();

        let ch = SafeChannel::<u8>::named("jobs", 1, Some(diag.bus()));
        ch.close();
        ch.close();
        assert!(!ch.write(1).await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        diag.shutdown().await;

        assert_eq!(
            *collect.seen.lock(),
            vec![
                EventKind::ChannelClosed,
                EventKind::CloseIgnored,
                EventKind::WriteRejected
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_without_subscribers() {
        let diag = Diagnostics::builder(Config::default()).build();
        diag.bus().publish(Event::now(EventKind::ShutdownRequested));
        tokio::time::timeout(Duration::from_secs(5), diag.shutdown())
            .await
            .unwrap();
    }
}
