//! # Guarded containers.
//!
//! - [`LockMap`] - key-value map behind a reader/writer lock (many readers, one writer)
//!
//! Used for membership tables that are shared instead of actor-owned, see
//! [`Broadcaster`](crate::Broadcaster).

mod map;

pub use map::LockMap;
