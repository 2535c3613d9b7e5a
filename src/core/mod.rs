//! Concurrency combinators built on [`SafeChannel`](crate::SafeChannel).
//!
//! - [`group`]: joinable set of stoppable tasks with a "stop all" broadcast;
//! - [`merger`]: dynamic fan-in, one relay task per source;
//! - [`splitter`]: dynamic fan-out with membership owned by one loop task;
//! - [`broadcaster`]: dynamic fan-out with lock-guarded membership;
//! - [`diagnostics`]: bus plus subscriber workers for the events all of the above publish.

mod broadcaster;
mod diagnostics;
mod group;
mod merger;
mod splitter;

pub use broadcaster::Broadcaster;
pub use diagnostics::{Diagnostics, DiagnosticsBuilder};
pub use group::{Group, StopSignal};
pub use merger::Merger;
pub use splitter::{OnEmpty, Splitter, SplitterBuilder};
