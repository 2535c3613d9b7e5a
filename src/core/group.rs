//! # Group: joinable set of stoppable tasks.
//!
//! A [`Group`] hands out stop signals, launches tasks, broadcasts "stop all" and waits for
//! every registered task to finish.
//!
//! ## Architecture
//! ```text
//!                 root: CancellationToken
//!            ┌──────────────┼──────────────┐
//!            ▼              ▼              ▼
//!       child token    child token    child token      (one stop signal per task)
//!            │              │              │
//!   chan() ──┘    add()/spawn() ──► tracker.spawn(task(stop))
//!                                         └─ on exit (any reason) ─► stop_all()
//!
//! stop_all(): root.cancel()  ─► every child observes cancellation at once
//!             tracker.close()
//! wait():     tracker.wait() ─► returns once closed AND every task/StopSignal is gone
//! ```
//!
//! ## State machine
//! ```text
//! Accepting ──stop_all()──► Closing ──last task exits──► Drained (wait returns)
//! ```
//! Adds stay permitted while closing; new tasks are born with an already cancelled signal.
//!
//! ## Rules
//! - any task exit (success, error, or panic) stops every sibling
//! - `stop_all` is idempotent and safe to race with `add`
//! - a [`StopSignal`] from [`Group::chan`] counts as one registered task until it is dropped

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::{TaskTracker, task_tracker::TaskTrackerToken};

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind, emit};
use crate::subscribers::panic_message;
use crate::tasks::{TaskFn, TaskRef};

/// Stop signal registered with a [`Group`].
///
/// Select on [`cancelled`](StopSignal::cancelled) in the long-running loop it guards.
/// Dropping the signal marks its join entry done.
#[derive(Debug)]
pub struct StopSignal {
    token: CancellationToken,
    _join: TaskTrackerToken,
}

impl StopSignal {
    /// Waits until the group stops.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Non-blocking check.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The underlying token, for composing with other cancellation sources.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Joinable set of tasks sharing one "stop all" broadcast.
///
/// Cloning is cheap; clones control the same group.
#[derive(Clone, Debug, Default)]
pub struct Group {
    root: CancellationToken,
    tracker: TaskTracker,
    bus: Option<Bus>,
}

/// Runs `stop_all` when a group task ends, including by panic or abort.
struct ExitGuard {
    group: Group,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.group.stop_all();
    }
}

impl Group {
    /// Creates an empty group in the accepting state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports task lifecycle to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Allocates a stop signal and registers it for [`wait`](Group::wait).
    pub fn chan(&self) -> StopSignal {
        StopSignal {
            token: self.root.child_token(),
            _join: self.tracker.token(),
        }
    }

    /// Launches `f` with a fresh stop signal.
    ///
    /// When the task returns, for any reason, the whole group is stopped.
    /// Must be called from within a tokio runtime.
    pub fn add<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let stop = self.root.child_token();
        self.launch(name.into(), f(stop));
    }

    /// Launches a named task definition with a fresh stop signal.
    ///
    /// Same exit policy as [`add`](Group::add).
    pub fn spawn(&self, task: TaskRef) {
        let stop = self.root.child_token();
        self.launch(task.name().to_string(), task.spawn(stop));
    }

    /// Launches `f` as a [`TaskFn`], for closures that already match the reusable shape.
    pub fn spawn_fn<F, Fut>(&self, name: &'static str, f: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.spawn(TaskFn::arc(name, f));
    }

    fn launch<Fut>(&self, name: String, fut: Fut)
    where
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let exit = ExitGuard {
            group: self.clone(),
        };
        let bus = self.bus.clone();

        emit(&bus, || {
            Event::now(EventKind::GroupTaskStarted).with_source(name.as_str())
        });
        self.tracker.spawn(async move {
            let _exit = exit;
            let res = std::panic::AssertUnwindSafe(fut).catch_unwind().await;
            emit(&bus, || match res {
                Ok(Ok(())) | Ok(Err(TaskError::Canceled)) => {
                    Event::now(EventKind::GroupTaskStopped).with_source(name.as_str())
                }
                Ok(Err(e)) => Event::now(EventKind::GroupTaskFailed)
                    .with_source(name.as_str())
                    .with_reason(e.to_string()),
                Err(panic_err) => Event::now(EventKind::GroupTaskPanicked)
                    .with_source(name.as_str())
                    .with_reason(panic_message(&*panic_err)),
            });
        });
    }

    /// Cancels every stop signal, current and future, and freezes the group.
    ///
    /// Idempotent; safe to call concurrently with `add`.
    pub fn stop_all(&self) {
        let first = !self.root.is_cancelled();
        self.root.cancel();
        self.tracker.close();
        if first {
            emit(&self.bus, || {
                Event::now(EventKind::GroupStopAll).with_count(self.tracker.len())
            });
        }
    }

    /// Waits until the group has been stopped and every registered task has finished.
    pub async fn wait(&self) {
        self.tracker.wait().await
    }

    /// Number of tasks and stop signals still registered.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Returns true once `stop_all` has been issued.
    pub fn is_stopping(&self) -> bool {
        self.root.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    async fn explode(_stop: CancellationToken) -> Result<(), TaskError> {
        panic!("kaboom")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wait_sees_every_task_finished() {
        let group = Group::new();
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..8 {
            let done = done.clone();
            group.add(format!("worker-{i}"), move |stop| async move {
                stop.cancelled().await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            });
        }
        let extra = group.chan();
        let watcher = {
            let done = done.clone();
            tokio::spawn(async move {
                extra.cancelled().await;
                done.fetch_add(1, Ordering::SeqCst);
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(done.load(Ordering::SeqCst), 0);

        group.stop_all();
        tokio::time::timeout(WAIT, group.wait()).await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 9);
        watcher.await.unwrap();
        assert!(group.is_empty());
    }

    #[tokio::test]
    async fn test_wait_blocks_until_stop_all() {
        let group = Group::new();
        let signal = group.chan();

        let waited = tokio::time::timeout(Duration::from_millis(50), group.wait()).await;
        assert!(waited.is_err());

        group.stop_all();
        assert!(signal.is_cancelled());
        drop(signal);
        tokio::time::timeout(WAIT, group.wait()).await.unwrap();
    }

    #[tokio::test]
    async fn test_one_exit_stops_siblings() {
        let group = Group::new();
        let stopped = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let stopped = stopped.clone();
            group.add("long", move |stop| async move {
                stop.cancelled().await;
                stopped.fetch_add(1, Ordering::SeqCst);
                Err(TaskError::Canceled)
            });
        }
        group.add("short", |_stop| async {
            Err(TaskError::Fail {
                error: "eof".into(),
            })
        });

        tokio::time::timeout(WAIT, group.wait()).await.unwrap();
        assert!(group.is_stopping());
        assert_eq!(stopped.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panic_still_stops_group() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let group = Group::new().with_bus(bus);

        let sibling = group.chan();
        group.add("bad", explode);

        tokio::time::timeout(WAIT, sibling.cancelled()).await.unwrap();
        drop(sibling);
        tokio::time::timeout(WAIT, group.wait()).await.unwrap();

        let mut saw_panic = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::GroupTaskPanicked {
                assert_eq!(ev.source.as_deref(), Some("bad"));
                assert_eq!(ev.reason.as_deref(), Some("kaboom"));
                saw_panic = true;
            }
        }
        assert!(saw_panic);
    }

    #[tokio::test]
    async fn test_add_after_stop_sees_closed_signal() {
        let group = Group::new();
        group.stop_all();
        group.stop_all();

        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        group.add("late", move |stop| async move {
            assert!(stop.is_cancelled());
            flag.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TaskError>(())
        });
        assert!(group.chan().is_cancelled());

        tokio::time::timeout(WAIT, group.wait()).await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_all_racing_add() {
        let group = Group::new();
        let added = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let mut racers = Vec::new();
        for _ in 0..4 {
            let group = group.clone();
            let added = added.clone();
            let done = done.clone();
            racers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let done = done.clone();
                    group.add("racer", move |stop| async move {
                        stop.cancelled().await;
                        done.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, TaskError>(())
                    });
                    added.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for _ in 0..4 {
            let group = group.clone();
            racers.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                group.stop_all();
            }));
        }
        for r in racers {
            tokio::time::timeout(WAIT, r).await.unwrap().unwrap();
        }

        tokio::time::timeout(WAIT, group.wait()).await.unwrap();
        assert!(group.is_stopping());
        assert_eq!(added.load(Ordering::SeqCst), 200);
        assert_eq!(done.load(Ordering::SeqCst), 200);
    }

    #[tokio::test]
    async fn test_spawn_task_definition() {
        let group = Group::new();
        group.spawn_fn("ticker", |stop: CancellationToken| async move {
            stop.cancelled().await;
            Ok::<_, TaskError>(())
        });
        assert_eq!(group.len(), 1);

        group.stop_all();
        tokio::time::timeout(WAIT, group.wait()).await.unwrap();
    }
}
