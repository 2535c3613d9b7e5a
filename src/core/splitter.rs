//! # Splitter: fan-out with actor-owned membership.
//!
//! One loop task owns the membership table. It serves two inputs, control messages
//! (add/remove) and dispatched items, so every mutation and every fan-out run in one place.
//!
//! ## Architecture
//! ```text
//! add(id) ────┐ Control::Add ──┐
//! remove(id) ─┘ Control::Remove┤        ┌──────────── loop ────────────┐
//!                              ├──────► │ members: HashMap<id, channel> │ ──► member 1
//! dispatch(x) ── Delivery ─────┘        │ select { closed | control |   │ ──► member 2
//!                                       │          delivery }           │ ──► ...
//!                                       └───────────────────────────────┘
//! ```
//!
//! ## Ordering
//! - `add`/`remove` return only after the loop applied them
//! - `dispatch` returns once the loop has taken the item (rendezvous)
//! - so any membership change is ordered against every dispatch issued after it returns;
//!   a change racing an in-flight dispatch may land on either side
//! - control messages win over a pending delivery, so a removed member never gets an
//!   item dispatched after its removal
//!
//! ## Shutdown
//! `close` (or dropping the [`Splitter`]) ends the loop, which closes every member.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::channels::{Reader, SafeChannel};
use crate::config::Config;
use crate::error::ChannelError;
use crate::events::{Bus, Event, EventKind, emit};

/// Callback run each time a removal leaves the splitter without members.
pub type OnEmpty = Arc<dyn Fn() + Send + Sync + 'static>;

enum Control<T> {
    Add {
        id: String,
        member: SafeChannel<T>,
        reply: oneshot::Sender<Result<(), ChannelError>>,
    },
    Remove {
        id: String,
        reply: oneshot::Sender<bool>,
    },
}

struct Delivery<T> {
    item: T,
    taken: oneshot::Sender<()>,
}

/// Fan-out of dispatched items to a dynamic set of named members.
///
/// # Example
/// ```
/// use chankit::Splitter;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let s = Splitter::new();
/// let m1 = s.add("m1").await.unwrap();
/// let m2 = s.add("m2").await.unwrap();
///
/// assert!(s.dispatch("x").await);
/// assert_eq!(m1.recv().await, Some("x"));
/// assert_eq!(m2.recv().await, Some("x"));
///
/// s.close().await;
/// assert_eq!(m1.recv().await, None);
/// # }
/// ```
pub struct Splitter<T> {
    name: Arc<str>,
    control: mpsc::Sender<Control<T>>,
    deliveries: mpsc::Sender<Delivery<T>>,
    closed: CancellationToken,
    finished: CancellationToken,
    members: Arc<AtomicUsize>,
    member_capacity: usize,
    bus: Option<Bus>,
}

/// Builder for [`Splitter`].
pub struct SplitterBuilder<T> {
    name: String,
    member_capacity: usize,
    on_empty: Option<OnEmpty>,
    bus: Option<Bus>,
    _item: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + 'static> SplitterBuilder<T> {
    fn new(cfg: &Config) -> Self {
        Self {
            name: "splitter".to_string(),
            member_capacity: cfg.member_capacity_clamped(),
            on_empty: None,
            bus: None,
            _item: PhantomData,
        }
    }

    /// Names the splitter and reports membership changes to `bus`.
    pub fn with_bus(mut self, name: impl Into<String>, bus: Bus) -> Self {
        self.name = name.into();
        self.bus = Some(bus);
        self
    }

    /// Runs `f` every time a removal leaves no members.
    pub fn on_empty<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_empty = Some(Arc::new(f));
        self
    }

    /// Buffer size of each member channel (minimum 1).
    pub fn member_capacity(mut self, capacity: usize) -> Self {
        self.member_capacity = capacity.max(1);
        self
    }

    /// Spawns the membership loop and returns the handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Splitter<T> {
        let (control_tx, control_rx) = mpsc::channel(1);
        let (delivery_tx, delivery_rx) = mpsc::channel(1);
        let name: Arc<str> = Arc::from(self.name);
        let closed = CancellationToken::new();
        let finished = CancellationToken::new();
        let members = Arc::new(AtomicUsize::new(0));

        let actor = Actor {
            name: name.clone(),
            control: control_rx,
            deliveries: delivery_rx,
            members: HashMap::new(),
            gauge: members.clone(),
            closed: closed.clone(),
            on_empty: self.on_empty,
            bus: self.bus.clone(),
        };
        let done = finished.clone();
        tokio::spawn(async move {
            actor.run().await;
            done.cancel();
        });

        Splitter {
            name,
            control: control_tx,
            deliveries: delivery_tx,
            closed,
            finished,
            members,
            member_capacity: self.member_capacity,
            bus: self.bus,
        }
    }
}

impl<T: Clone + Send + 'static> Default for Splitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Splitter<T> {
    /// Spawns a splitter with the default [`Config`].
    pub fn new() -> Self {
        Self::builder(&Config::default()).build()
    }

    pub fn builder(cfg: &Config) -> SplitterBuilder<T> {
        SplitterBuilder::new(cfg)
    }

    /// Registers member `id` and returns its read handle.
    ///
    /// Fails with [`ChannelError::MemberExists`] if `id` is live, or
    /// [`ChannelError::Closed`] once the splitter is closed.
    pub async fn add(&self, id: impl Into<String>) -> Result<Reader<T>, ChannelError> {
        let id = id.into();
        let member = SafeChannel::named(
            format!("{}/{id}", self.name),
            self.member_capacity,
            self.bus.clone(),
        );
        let reader = member.reader();
        let (reply, ack) = oneshot::channel();

        self.request(Control::Add { id, member, reply }, ack)
            .await
            .unwrap_or(Err(ChannelError::Closed))?;
        Ok(reader)
    }

    /// Removes and closes member `id`.
    ///
    /// Returns false if `id` was not a member or the splitter is closed.
    pub async fn remove(&self, id: &str) -> bool {
        let (reply, ack) = oneshot::channel();
        let msg = Control::Remove {
            id: id.to_string(),
            reply,
        };
        self.request(msg, ack).await.unwrap_or(false)
    }

    async fn request<R>(&self, msg: Control<T>, ack: oneshot::Receiver<R>) -> Option<R> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => return None,
            sent = self.control.send(msg) => sent.ok()?,
        }
        ack.await.ok()
    }

    /// Hands `item` to the loop for delivery to every current member.
    ///
    /// Waits until the loop takes the item; returns false if the splitter closed first.
    pub async fn dispatch(&self, item: T) -> bool {
        let (taken, ack) = oneshot::channel();
        let delivery = Delivery { item, taken };
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => false,
            sent = self.deliveries.send(delivery) => sent.is_ok() && ack.await.is_ok(),
        }
    }

    /// Current member count.
    pub fn len(&self) -> usize {
        self.members.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_open(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// Stops the loop and waits until every member is closed.
    ///
    /// Idempotent.
    pub async fn close(&self) {
        self.closed.cancel();
        self.finished.cancelled().await;
    }
}

impl<T> Drop for Splitter<T> {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

/// Sole owner of the membership table.
struct Actor<T> {
    name: Arc<str>,
    control: mpsc::Receiver<Control<T>>,
    deliveries: mpsc::Receiver<Delivery<T>>,
    members: HashMap<String, SafeChannel<T>>,
    gauge: Arc<AtomicUsize>,
    closed: CancellationToken,
    on_empty: Option<OnEmpty>,
    bus: Option<Bus>,
}

impl<T: Clone + Send + 'static> Actor<T> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => break,
                msg = self.control.recv() => match msg {
                    Some(msg) => self.apply(msg),
                    None => break,
                },
                delivery = self.deliveries.recv() => match delivery {
                    Some(Delivery { item, taken }) => {
                        let _ = taken.send(());
                        if !self.fan_out(item).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    fn apply(&mut self, msg: Control<T>) {
        match msg {
            Control::Add { id, member, reply } => {
                let res = if self.closed.is_cancelled() {
                    Err(ChannelError::Closed)
                } else if self.members.contains_key(&id) {
                    Err(ChannelError::MemberExists { id: id.clone() })
                } else {
                    self.members.insert(id.clone(), member.clone());
                    Ok(())
                };

                match &res {
                    Ok(()) => {
                        self.gauge.store(self.members.len(), Ordering::Release);
                        self.report(EventKind::MemberAdded, &id, None);
                    }
                    Err(e) => {
                        member.close();
                        self.report(EventKind::MemberRejected, &id, Some(e.as_label()));
                    }
                }
                let _ = reply.send(res);
            }
            Control::Remove { id, reply } => {
                let removed = match self.members.remove(&id) {
                    Some(member) => {
                        member.close();
                        self.gauge.store(self.members.len(), Ordering::Release);
                        self.report(EventKind::MemberRemoved, &id, None);
                        if self.members.is_empty() {
                            emit(&self.bus, || {
                                Event::now(EventKind::MembershipEmpty).with_source(self.name.clone())
                            });
                            if let Some(on_empty) = &self.on_empty {
                                on_empty();
                            }
                        }
                        true
                    }
                    None => false,
                };
                let _ = reply.send(removed);
            }
        }
    }

    /// Writes `item` to every member in turn; returns false if shutdown interrupted it.
    async fn fan_out(&self, item: T) -> bool {
        for member in self.members.values() {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => return false,
                _ = member.write(item.clone()) => {}
            }
        }
        true
    }

    fn report(&self, kind: EventKind, id: &str, reason: Option<&'static str>) {
        emit(&self.bus, || {
            let ev = Event::now(kind)
                .with_source(self.name.clone())
                .with_member(id)
                .with_count(self.members.len());
            match reason {
                Some(reason) => ev.with_reason(reason),
                None => ev,
            }
        });
    }

    fn shutdown(&mut self) {
        self.closed.cancel();
        self.control.close();
        self.deliveries.close();

        let count = self.members.len();
        for (_, member) in self.members.drain() {
            member.close();
        }
        self.gauge.store(0, Ordering::Release);
        emit(&self.bus, || {
            Event::now(EventKind::SplitterClosed)
                .with_source(self.name.clone())
                .with_count(count)
        });
    }
}
