//! Restricted views over a [`SafeChannel`].
//!
//! Combinators hand these out instead of the channel itself, so each caller only gets the
//! capability it needs: a merger source is write+close, an aggregate or fan-out member is
//! receive-only.

use futures::Stream;
use tokio_util::sync::CancellationToken;

use super::SafeChannel;

/// Write-and-close view of a channel.
///
/// Closing is how a producer signals a natural end of its stream.
#[derive(Debug)]
pub struct Writer<T> {
    ch: SafeChannel<T>,
}

impl<T> Clone for Writer<T> {
    fn clone(&self) -> Self {
        Self {
            ch: self.ch.clone(),
        }
    }
}

impl<T> Writer<T> {
    pub(crate) fn new(ch: SafeChannel<T>) -> Self {
        Self { ch }
    }

    /// See [`SafeChannel::write`].
    pub async fn write(&self, value: T) -> bool {
        self.ch.write(value).await
    }

    /// See [`SafeChannel::try_write`].
    pub fn try_write(&self, value: T) -> bool {
        self.ch.try_write(value)
    }

    /// See [`SafeChannel::close`].
    pub fn close(&self) -> bool {
        self.ch.close()
    }

    /// See [`SafeChannel::is_open`].
    pub fn is_open(&self) -> bool {
        self.ch.is_open()
    }

    /// See [`SafeChannel::closed_token`].
    pub fn closed_token(&self) -> CancellationToken {
        self.ch.closed_token()
    }
}

/// Receive-only view of a channel.
#[derive(Debug)]
pub struct Reader<T> {
    ch: SafeChannel<T>,
}

impl<T> Clone for Reader<T> {
    fn clone(&self) -> Self {
        Self {
            ch: self.ch.clone(),
        }
    }
}

impl<T> Reader<T> {
    pub(crate) fn new(ch: SafeChannel<T>) -> Self {
        Self { ch }
    }

    /// See [`SafeChannel::recv`].
    pub async fn recv(&self) -> Option<T> {
        self.ch.recv().await
    }

    /// See [`SafeChannel::try_recv`].
    pub fn try_recv(&self) -> Option<T> {
        self.ch.try_recv()
    }

    /// See [`SafeChannel::is_open`].
    pub fn is_open(&self) -> bool {
        self.ch.is_open()
    }

    /// See [`SafeChannel::closed_token`].
    pub fn closed_token(&self) -> CancellationToken {
        self.ch.closed_token()
    }

    /// Turns the reader into a stream that ends once the channel is closed and drained.
    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures::stream::unfold(self, |reader| async move {
            let item = reader.recv().await?;
            Some((item, reader))
        })
    }
}

impl<T> SafeChannel<T> {
    /// Write-and-close view of this channel.
    pub fn writer(&self) -> Writer<T> {
        Writer::new(self.clone())
    }

    /// Receive-only view of this channel.
    pub fn reader(&self) -> Reader<T> {
        Reader::new(self.clone())
    }
}
