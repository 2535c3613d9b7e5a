//! # Diagnostics events emitted by channels and combinators.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Channel events**: close and rejected-write reports from [`SafeChannel`](crate::SafeChannel)
//! - **Group events**: task lifecycle inside a [`Group`](crate::Group)
//! - **Fan-in / fan-out events**: membership changes of mergers, splitters and broadcasters
//! - **Runtime events**: subscriber health and process shutdown requests
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the emitting
//! component, the affected member and a reason.
//!
//! ## Ordering guarantees
//! Each event gets a sequence number from the [`Bus`](crate::Bus) it is published on.
//! Sequence numbers increase monotonically per bus.
//!
//! ## Example
//! ```rust
//! use chankit::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::MemberRemoved)
//!     .with_source("splitter")
//!     .with_member("m1")
//!     .with_count(0);
//!
//! assert_eq!(ev.kind, EventKind::MemberRemoved);
//! assert_eq!(ev.member.as_deref(), Some("m1"));
//! assert_eq!(ev.count, Some(0));
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use tracing::Level;

/// Classification of diagnostics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Channel events ===
    /// A channel was closed (first and only effective close).
    ///
    /// Sets:
    /// - `source`: channel name
    ChannelClosed,

    /// A write was refused because the channel is closed or was never made.
    ///
    /// Sets:
    /// - `source`: channel name
    /// - `reason`: `"closed"` or `"unmade"`
    WriteRejected,

    /// A close call found the channel already closed (no effect).
    ///
    /// Sets:
    /// - `source`: channel name
    CloseIgnored,

    // === Group events ===
    /// Group task launched.
    ///
    /// Sets:
    /// - `source`: task name
    GroupTaskStarted,

    /// Group task returned `Ok(())` or `Err(Canceled)`.
    ///
    /// Sets:
    /// - `source`: task name
    GroupTaskStopped,

    /// Group task returned an error.
    ///
    /// Sets:
    /// - `source`: task name
    /// - `reason`: error message
    GroupTaskFailed,

    /// Group task panicked.
    ///
    /// Sets:
    /// - `source`: task name
    /// - `reason`: panic message
    GroupTaskPanicked,

    /// Stop-all broadcast issued to every stop signal of a group.
    ///
    /// Sets:
    /// - `count`: tasks tracked at that moment
    GroupStopAll,

    // === Fan-in events ===
    /// A merger source was registered and its relay started.
    ///
    /// Sets:
    /// - `source`: merger name
    /// - `member`: source id
    SourceAdded,

    /// A merger relay exited.
    ///
    /// Sets:
    /// - `source`: merger name
    /// - `member`: source id
    /// - `reason`: `"drained"` (source closed) or `"shutdown"` (merger closed)
    SourceStopped,

    /// A merger finished shutting down; its aggregate is closed.
    ///
    /// Sets:
    /// - `source`: merger name
    MergerClosed,

    // === Fan-out events ===
    /// A fan-out member was registered.
    ///
    /// Sets:
    /// - `source`: splitter/broadcaster name
    /// - `member`: member id
    /// - `count`: members after the change
    MemberAdded,

    /// A fan-out member was removed and its channel closed.
    ///
    /// Sets:
    /// - `source`: splitter/broadcaster name
    /// - `member`: member id
    /// - `count`: members after the change
    MemberRemoved,

    /// A membership change was refused.
    ///
    /// Sets:
    /// - `source`: splitter name
    /// - `member`: member id
    /// - `reason`: error label
    MemberRejected,

    /// Membership dropped to zero through a removal.
    ///
    /// Sets:
    /// - `source`: splitter name
    MembershipEmpty,

    /// A splitter closed every member and its loop stopped.
    ///
    /// Sets:
    /// - `source`: splitter name
    /// - `count`: members closed
    SplitterClosed,

    /// A broadcaster closed every member and refuses further adds.
    ///
    /// Sets:
    /// - `source`: broadcaster name
    /// - `count`: members closed
    BroadcasterClosed,

    // === Runtime events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// OS signal handlers could not be installed; the shutdown token will not fire.
    ///
    /// Sets:
    /// - `reason`: registration error
    SignalUnavailable,
}

impl EventKind {
    /// Severity used when the event is rendered as a log line.
    pub fn level(self) -> Level {
        match self {
            EventKind::GroupTaskFailed | EventKind::GroupTaskPanicked | EventKind::SubscriberPanicked => {
                Level::ERROR
            }
            EventKind::MemberRejected
            | EventKind::SubscriberOverflow
            | EventKind::SignalUnavailable => Level::WARN,
            EventKind::ChannelClosed
            | EventKind::GroupStopAll
            | EventKind::MergerClosed
            | EventKind::SplitterClosed
            | EventKind::BroadcasterClosed
            | EventKind::ShutdownRequested => Level::INFO,
            _ => Level::DEBUG,
        }
    }
}

/// Diagnostics event with optional metadata.
///
/// - `seq`: per-bus monotonic sequence, stamped on publish
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Monotonically increasing sequence number (0 until published).
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the emitting component (channel, task, merger, splitter, subscriber).
    pub source: Option<Arc<str>>,
    /// Affected member or source id, if applicable.
    pub member: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Count attached to membership and stop-all events.
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind stamped with the current time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            source: None,
            member: None,
            reason: None,
            count: None,
        }
    }

    /// Attaches the emitting component name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a member id.
    #[inline]
    pub fn with_member(mut self, member: impl Into<Arc<str>>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }
}
