//! # LogWriter — renders events through `tracing`
//!
//! A subscriber that turns every [`Event`] into one `tracing` record, at the level
//! reported by [`EventKind::level`]. Install any `tracing` subscriber to see the output.
//!
//! ## Example output
//! ```text
//! DEBUG chankit: [write-rejected] source="merger/source-3" reason="closed"
//!  INFO chankit: [merger-closed] source="merger"
//!  WARN chankit: [member-rejected] source="splitter" member="m1" reason="member_exists"
//! ERROR chankit: [task-failed] source="ingest" reason="execution failed: eof"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;
use tracing::Level;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Short bracketed tag used as the message prefix.
fn tag(kind: EventKind) -> &'static str {
    match kind {
        EventKind::ChannelClosed => "channel-closed",
        EventKind::WriteRejected => "write-rejected",
        EventKind::CloseIgnored => "close-ignored",
        EventKind::GroupTaskStarted => "task-started",
        EventKind::GroupTaskStopped => "task-stopped",
        EventKind::GroupTaskFailed => "task-failed",
        EventKind::GroupTaskPanicked => "task-panicked",
        EventKind::GroupStopAll => "stop-all",
        EventKind::SourceAdded => "source-added",
        EventKind::SourceStopped => "source-stopped",
        EventKind::MergerClosed => "merger-closed",
        EventKind::MemberAdded => "member-added",
        EventKind::MemberRemoved => "member-removed",
        EventKind::MemberRejected => "member-rejected",
        EventKind::MembershipEmpty => "membership-empty",
        EventKind::SplitterClosed => "splitter-closed",
        EventKind::BroadcasterClosed => "broadcaster-closed",
        EventKind::SubscriberPanicked => "subscriber-panicked",
        EventKind::SubscriberOverflow => "subscriber-overflow",
        EventKind::ShutdownRequested => "shutdown-requested",
        EventKind::SignalUnavailable => "signal-unavailable",
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tag = tag(e.kind);
        let source = e.source.as_deref().unwrap_or("-");
        let member = e.member.as_deref();
        let reason = e.reason.as_deref();

        let level = e.kind.level();
        if level == Level::ERROR {
            tracing::error!(seq = e.seq, ?member, ?reason, count = ?e.count, "[{tag}] source={source:?}");
        } else if level == Level::WARN {
            tracing::warn!(seq = e.seq, ?member, ?reason, count = ?e.count, "[{tag}] source={source:?}");
        } else if level == Level::INFO {
            tracing::info!(seq = e.seq, ?member, ?reason, count = ?e.count, "[{tag}] source={source:?}");
        } else {
            tracing::debug!(seq = e.seq, ?member, ?reason, count = ?e.count, "[{tag}] source={source:?}");
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
