//! # Broadcaster: fan-out with lock-guarded membership.
//!
//! The writer delivers each item to every member itself, in sequence. Membership lives in a
//! [`LockMap`]; `add`/`remove` take the write lock, `write` only holds the read lock long
//! enough to snapshot the member handles.
//!
//! ```text
//! write(item) ──► snapshot members (read lock) ──► member 1 .write(item.clone())
//!                                                  member 2 .write(item.clone())
//!                                                  ...
//! ```
//!
//! ## Rules
//! - one slow member stalls the whole `write` call (explicit backpressure)
//! - a member removed mid-write is already closed, so the write to it fails
//! - ids come from a counter and are never reused
//!
//! Prefer [`Splitter`](crate::Splitter) when membership churn must be strictly ordered
//! against dispatch.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use crate::channels::{Reader, SafeChannel};
use crate::config::Config;
use crate::error::ChannelError;
use crate::events::{Bus, Event, EventKind, emit};
use crate::lockable::LockMap;

/// Fan-out whose writer delivers to every member directly.
///
/// # Example
/// ```
/// use chankit::Broadcaster;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let b = Broadcaster::new();
/// let (id1, r1) = b.add().unwrap();
/// let (id2, r2) = b.add().unwrap();
/// assert_ne!(id1, id2);
///
/// assert_eq!(b.write("hello").await, 2);
/// assert_eq!(r1.recv().await, Some("hello"));
/// assert_eq!(r2.recv().await, Some("hello"));
/// # }
/// ```
pub struct Broadcaster<T> {
    name: String,
    members: LockMap<u64, SafeChannel<T>>,
    next_id: AtomicU64,
    member_capacity: usize,
    closed: CancellationToken,
    bus: Option<Bus>,
}

impl<T: Clone + Send + 'static> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    /// Creates a broadcaster with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Creates a broadcaster whose member channels are sized by `cfg.member_capacity`.
    pub fn with_config(cfg: &Config) -> Self {
        Self {
            name: "broadcaster".to_string(),
            members: LockMap::new(),
            next_id: AtomicU64::new(0),
            member_capacity: cfg.member_capacity_clamped(),
            closed: CancellationToken::new(),
            bus: None,
        }
    }

    /// Names the broadcaster and reports membership changes to `bus`.
    pub fn with_bus(mut self, name: impl Into<String>, bus: Bus) -> Self {
        self.name = name.into();
        self.bus = Some(bus);
        self
    }

    /// Registers a member and returns its id and read handle.
    pub fn add(&self) -> Result<(u64, Reader<T>), ChannelError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let member = SafeChannel::named(
            format!("{}/member-{id}", self.name),
            self.member_capacity,
            self.bus.clone(),
        );
        let reader = member.reader();

        let count = self.members.with_mut(|m| {
            if self.closed.is_cancelled() {
                return Err(ChannelError::Closed);
            }
            m.insert(id, member);
            Ok(m.len())
        })?;

        emit(&self.bus, || {
            Event::now(EventKind::MemberAdded)
                .with_source(self.name.as_str())
                .with_member(id.to_string())
                .with_count(count)
        });
        Ok((id, reader))
    }

    /// Removes and closes a member; unknown ids are a no-op returning false.
    pub fn remove(&self, id: u64) -> bool {
        let Some((member, left)) = self
            .members
            .with_mut(|m| m.remove(&id).map(|member| (member, m.len())))
        else {
            return false;
        };
        member.close();

        emit(&self.bus, || {
            Event::now(EventKind::MemberRemoved)
                .with_source(self.name.as_str())
                .with_member(id.to_string())
                .with_count(left)
        });
        if left == 0 {
            emit(&self.bus, || {
                Event::now(EventKind::MembershipEmpty).with_source(self.name.as_str())
            });
        }
        true
    }

    /// Delivers `item` to every current member, waiting on each in turn.
    ///
    /// Returns how many members accepted it.
    pub async fn write(&self, item: T) -> usize {
        if self.closed.is_cancelled() {
            return 0;
        }
        let mut delivered = 0;
        for member in self.members.values() {
            if member.write(item.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_open(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// Closes every member and refuses further adds.
    ///
    /// Returns false if already closed.
    pub fn close(&self) -> bool {
        let drained = self.members.with_mut(|m| {
            if self.closed.is_cancelled() {
                return None;
            }
            self.closed.cancel();
            Some(m.drain().map(|(_, ch)| ch).collect::<Vec<_>>())
        });
        let Some(drained) = drained else {
            return false;
        };

        for member in &drained {
            member.close();
        }
        emit(&self.bus, || {
            Event::now(EventKind::BroadcasterClosed)
                .with_source(self.name.as_str())
                .with_count(drained.len())
        });
        true
    }
}

impl<T> Drop for Broadcaster<T> {
    fn drop(&mut self) {
        for (_, member) in self.members.drain() {
            member.close();
        }
    }
}
