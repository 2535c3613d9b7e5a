//! Error types used by the channel combinators and group tasks.
//!
//! This module defines two enums:
//!
//! - [`ChannelError`] — misuse of a combinator that has already shut down, or a rejected membership change.
//! - [`TaskError`] — errors returned by tasks running inside a [`Group`](crate::Group).
//!
//! Neither type is used for the benign close races: writing to a closed channel is reported
//! as `false`, never as an error.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logs and diagnostics events.

use thiserror::Error;

/// # Errors produced by the combinators.
///
/// Returned when an operation needs a live combinator (or a free member id) and did not get one.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The combinator was closed before (or while) the operation ran.
    #[error("channel closed")]
    Closed,

    /// A splitter member with the same id is still registered.
    #[error("member {id:?} already registered")]
    MemberExists {
        /// The rejected member id.
        id: String,
    },
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use chankit::ChannelError;
    ///
    /// assert_eq!(ChannelError::Closed.as_label(), "channel_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Closed => "channel_closed",
            ChannelError::MemberExists { .. } => "member_exists",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ChannelError::Closed => "closed".to_string(),
            ChannelError::MemberExists { id } => format!("duplicate member: {id}"),
        }
    }
}

/// # Errors produced by group tasks.
///
/// Any task exit stops the whole group; the error only changes what gets reported.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task noticed its stop signal and bailed out early.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use chankit::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }
}
