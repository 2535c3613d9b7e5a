//! Receiving with an external cancellation source.

use tokio_util::sync::CancellationToken;

use super::Reader;

/// Outcome of [`recv_with_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv<T> {
    /// An item arrived.
    Item(T),
    /// The channel is closed and drained.
    Closed,
    /// The token fired first.
    Cancelled,
}

impl<T> Recv<T> {
    /// The item, if one arrived.
    pub fn item(self) -> Option<T> {
        match self {
            Recv::Item(v) => Some(v),
            Recv::Closed | Recv::Cancelled => None,
        }
    }
}

/// Races one receive against `token`.
///
/// This is how callers put a deadline on a read: pass a token cancelled by a timer,
/// a parent shutdown, or [`signals::shutdown_token`](crate::signals::shutdown_token).
/// If both are ready, cancellation wins.
pub async fn recv_with_token<T>(token: &CancellationToken, reader: &Reader<T>) -> Recv<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Recv::Cancelled,
        item = reader.recv() => match item {
            Some(v) => Recv::Item(v),
            None => Recv::Closed,
        },
    }
}
