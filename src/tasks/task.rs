//! # Task abstraction.
//!
//! This module defines the [`Task`] trait: a named unit of work that a
//! [`Group`](crate::Group) runs until it finishes or its stop signal fires.
//!
//! A task receives a [`CancellationToken`] (its stop signal) and should select on it
//! inside any long wait.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// # Asynchronous, stoppable unit.
///
/// A `Task` has a stable [`name`](Task::name) and produces a fresh future per
/// [`spawn`](Task::spawn), so one definition can be launched into several groups.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use chankit::{BoxTaskFuture, Task};
///
/// struct Ticker;
///
/// impl Task for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     fn spawn(&self, stop: CancellationToken) -> BoxTaskFuture {
///         Box::pin(async move {
///             stop.cancelled().await;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Creates the future for one run of the task.
    ///
    /// The future should return promptly once `stop` is cancelled.
    fn spawn(&self, stop: CancellationToken) -> BoxTaskFuture;
}
