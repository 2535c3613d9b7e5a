//! # chankit
//!
//! **chankit** is a small toolkit of channel concurrency primitives for tokio.
//!
//! It provides a close-safe channel, a joinable task group, and dynamic fan-in / fan-out
//! combinators whose membership can change while items are flowing.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  producers                                                       consumers
//!  ─────────                                                       ─────────
//!  Writer ──► [source] ──► relay ──┐
//!  Writer ──► [source] ──► relay ──┼──► Merger [aggregate] ──► Reader
//!  Writer ──► [source] ──► relay ──┘
//!
//!  dispatch(item) ──► Splitter loop ──┬──► [member m1] ──► Reader
//!                     (owns table)    ├──► [member m2] ──► Reader
//!  add(id) / remove(id) ──────────────┘
//!
//!  write(item) ──► Broadcaster ───────┬──► [member 1] ──► Reader
//!                  (LockMap table)    └──► [member 2] ──► Reader
//!
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Group                                                            │
//! │  - root CancellationToken (one child per task = stop signal)      │
//! │  - TaskTracker (join counter, wait() after stop_all())            │
//! └───────────────────────────────────────────────────────────────────┘
//!
//!  every [..] box is a SafeChannel: bounded, exactly-once close, closed-signal
//! ```
//!
//! ### Diagnostics
//! ```text
//! SafeChannel / Group / Merger / Splitter / Broadcaster
//!        │ publish(Event)
//!        ▼
//! ┌───────────────────────────────┐
//! │   Bus (broadcast channel)     │
//! └──────────────┬────────────────┘
//!                ▼
//!       Diagnostics listener ──► SubscriberSet ──┬──► LogWriter (tracing)
//!                                                └──► custom Subscribe impls
//! ```
//! Components only publish when given a [`Bus`]; nothing is global.
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                          |
//! |-------------------|-------------------------------------------------------------------|---------------------------------------------|
//! | **Channels**      | Bounded queue, idempotent close, closed-signal, capability views. | [`SafeChannel`], [`Writer`], [`Reader`]     |
//! | **Groups**        | Stop signals, stop-all broadcast, join.                           | [`Group`], [`StopSignal`], [`Task`]         |
//! | **Fan-in**        | Dynamic sources merged into one aggregate.                        | [`Merger`]                                  |
//! | **Fan-out**       | Dynamic members fed from one input.                               | [`Splitter`], [`Broadcaster`]               |
//! | **Diagnostics**   | Typed events, subscriber workers, tracing output.                 | [`Diagnostics`], [`Subscribe`], [`LogWriter`] |
//! | **Errors**        | Typed errors for membership and task results.                     | [`ChannelError`], [`TaskError`]             |
//! | **Configuration** | Buffer sizes.                                                     | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use chankit::{Group, Merger, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let merger = Merger::new();
//!     let group = Group::new();
//!
//!     for n in 0..3u32 {
//!         let source = merger.add().unwrap();
//!         group.add(format!("producer-{n}"), move |stop| async move {
//!             tokio::select! {
//!                 _ = stop.cancelled() => {}
//!                 _ = source.write(n) => {}
//!             }
//!             source.close();
//!             stop.cancelled().await;
//!             Ok::<_, TaskError>(())
//!         });
//!     }
//!
//!     let aggr = merger.aggr();
//!     let mut sum = 0;
//!     for _ in 0..3 {
//!         sum += aggr.recv().await.unwrap();
//!     }
//!     assert_eq!(sum, 3);
//!
//!     group.stop_all();
//!     group.wait().await;
//!     merger.close().await;
//! }
//! ```
mod channels;
mod config;
mod core;
mod error;
mod events;
mod lockable;
mod subscribers;
mod tasks;

pub mod signals;

// ---- Public re-exports ----

pub use channels::{
    ChanCloser, ChanReadCloser, ChanReadWriteCloser, ChanReadWriter, ChanReader, ChanWriteCloser,
    ChanWriter, Reader, Recv, SafeChannel, Writer, recv_with_token,
};
pub use config::Config;
pub use crate::core::{
    Broadcaster, Diagnostics, DiagnosticsBuilder, Group, Merger, OnEmpty, Splitter,
    SplitterBuilder, StopSignal,
};
pub use error::{ChannelError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use lockable::LockMap;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef};
