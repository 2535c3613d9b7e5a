//! # Diagnostics subscribers.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Merger relay ── publish(Event) ──► Bus ──► Diagnostics listener ──► SubscriberSet::emit
//!                                                                          │
//!                                                                   ┌──────┴──────┐
//!                                                                   ▼             ▼
//!                                                               LogWriter      Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use chankit::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct ClosedCounter;
//!
//! #[async_trait]
//! impl Subscribe for ClosedCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ChannelClosed {
//!             // increment counter
//!         }
//!     }
//! }
//! ```

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub(crate) use subscriber_set::panic_message;
pub use subscriber_set::SubscriberSet;
