//! # Task abstractions.
//!
//! This module provides the task-related types run by a [`Group`](crate::Group):
//! - [`Task`] - trait for named, stoppable async units
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)

mod task;
mod task_fn;

pub use task::{BoxTaskFuture, Task};
pub use task_fn::{TaskFn, TaskRef};
