//! # Capability traits
//!
//! Permission interfaces over channel-shaped values. A function that takes
//! `&dyn ChanWriter<T>` can produce but never consume or close; one that takes
//! `&dyn ChanReadCloser<T>` can consume and close but never produce.
//!
//! ```text
//!            ChanReader   ChanWriter   ChanCloser
//! SafeChannel     ✓            ✓            ✓
//! Writer          -            ✓            ✓
//! Reader          ✓            -            -
//! ```
//!
//! The composite traits are blanket-implemented for anything with the matching parts.

use async_trait::async_trait;

use super::{Reader, SafeChannel, Writer};

/// Permission to write. Implicitly includes being told about the close (writes return `false`).
#[async_trait]
pub trait ChanWriter<T: Send + 'static>: Send + Sync {
    /// Enqueues `value`; `false` once the channel is closed.
    async fn write(&self, value: T) -> bool;
}

/// Permission to consume.
#[async_trait]
pub trait ChanReader<T: Send + 'static>: Send + Sync {
    /// Next item; `None` once closed and drained.
    async fn read(&self) -> Option<T>;
}

/// Permission to close.
pub trait ChanCloser: Send + Sync {
    /// Closes the channel; `true` only for the call that performed the close.
    fn close(&self) -> bool;
}

/// Read and close permissions.
pub trait ChanReadCloser<T: Send + 'static>: ChanReader<T> + ChanCloser {}
impl<T: Send + 'static, C: ChanReader<T> + ChanCloser + ?Sized> ChanReadCloser<T> for C {}

/// Write and close permissions.
pub trait ChanWriteCloser<T: Send + 'static>: ChanWriter<T> + ChanCloser {}
impl<T: Send + 'static, C: ChanWriter<T> + ChanCloser + ?Sized> ChanWriteCloser<T> for C {}

/// Read and write permissions.
pub trait ChanReadWriter<T: Send + 'static>: ChanReader<T> + ChanWriter<T> {}
impl<T: Send + 'static, C: ChanReader<T> + ChanWriter<T> + ?Sized> ChanReadWriter<T> for C {}

/// All permissions.
pub trait ChanReadWriteCloser<T: Send + 'static>: ChanReadWriter<T> + ChanCloser {}
impl<T: Send + 'static, C: ChanReadWriter<T> + ChanCloser + ?Sized> ChanReadWriteCloser<T> for C {}

#[async_trait]
impl<T: Send + 'static> ChanWriter<T> for SafeChannel<T> {
    async fn write(&self, value: T) -> bool {
        SafeChannel::write(self, value).await
    }
}

#[async_trait]
impl<T: Send + 'static> ChanReader<T> for SafeChannel<T> {
    async fn read(&self) -> Option<T> {
        self.recv().await
    }
}

impl<T: Send + 'static> ChanCloser for SafeChannel<T> {
    fn close(&self) -> bool {
        SafeChannel::close(self)
    }
}

#[async_trait]
impl<T: Send + 'static> ChanWriter<T> for Writer<T> {
    async fn write(&self, value: T) -> bool {
        Writer::write(self, value).await
    }
}

impl<T: Send + 'static> ChanCloser for Writer<T> {
    fn close(&self) -> bool {
        Writer::close(self)
    }
}

#[async_trait]
impl<T: Send + 'static> ChanReader<T> for Reader<T> {
    async fn read(&self) -> Option<T> {
        self.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn produce(w: &dyn ChanWriteCloser<i32>) {
        assert!(w.write(1).await);
        assert!(w.close());
    }

    async fn consume(r: &dyn ChanReader<i32>) -> Vec<i32> {
        let mut out = Vec::new();
        while let Some(v) = r.read().await {
            out.push(v);
        }
        out
    }

    #[tokio::test]
    async fn test_write_closer_then_reader() {
        let ch = SafeChannel::new(1);
        produce(&ch.writer()).await;
        assert_eq!(consume(&ch.reader()).await, vec![1]);
    }

    #[tokio::test]
    async fn test_read_write_closer() {
        let ch = SafeChannel::new(1);
        let rwc: &dyn ChanReadWriteCloser<i32> = &ch;
        assert!(rwc.write(1).await);
        assert_eq!(rwc.read().await, Some(1));
        assert!(rwc.close());
        assert!(!ch.is_open());
    }

    #[tokio::test]
    async fn test_read_closer_on_separate_task() {
        let ch = SafeChannel::<()>::new(1);
        let rc = ch.clone();
        let reader = tokio::spawn(async move {
            let rc: &dyn ChanReadCloser<()> = &rc;
            rc.read().await;
            rc.close();
        });
        assert!(ch.write(()).await);
        reader.await.unwrap();
        assert!(!ch.is_open());
    }
}
