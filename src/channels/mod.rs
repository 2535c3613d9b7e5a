//! Close-safe channels.
//!
//! - [`SafeChannel`] — bounded queue with an exactly-once close and a closed-signal
//! - [`Writer`] / [`Reader`] — restricted views handed out by the combinators
//! - capability traits ([`ChanWriter`], [`ChanReader`], [`ChanCloser`] and composites)
//! - [`recv_with_token`] — one receive raced against an external cancellation token

mod handles;
mod recv;
mod safe;
mod traits;

pub use handles::{Reader, Writer};
pub use recv::{Recv, recv_with_token};
pub use safe::SafeChannel;
pub use traits::{
    ChanCloser, ChanReadCloser, ChanReadWriteCloser, ChanReadWriter, ChanReader, ChanWriteCloser,
    ChanWriter,
};
