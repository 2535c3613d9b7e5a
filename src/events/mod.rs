//! Diagnostics events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to diagnostics emitted by channels, groups, mergers and splitters.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `SafeChannel`, `Group`, `Merger` relays, the `Splitter` loop,
//!   `Broadcaster`, `SubscriberSet` workers (overflow/panic), `signals::shutdown_token`.
//! - **Consumers**: the `Diagnostics` listener (fans out to `SubscriberSet`), or any
//!   receiver obtained through [`Bus::subscribe`].

mod bus;
mod event;

pub(crate) use bus::emit;
pub use bus::Bus;
pub use event::{Event, EventKind};
