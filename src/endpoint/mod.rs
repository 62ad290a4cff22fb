//! Role-specific endpoints between transports and relays
//!
//! - [`ReceiveEndpoint`]: the publisher side, a source of reassembled frames
//!   plus a disconnect callback
//! - [`SendEndpoint`]: the subscriber side, one [`FrameSink`] per subscriber

use std::future::Future;
use std::pin::Pin;

use crate::error::ConnectionError;
use crate::framing::Frame;

pub mod receive;
pub mod send;

pub use receive::{ReceiveEndpoint, HANDOFF_CAPACITY};
pub use send::SendEndpoint;

/// Future returned by [`FrameSink::send`]
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<usize, ConnectionError>> + Send + 'a>>;

/// Destination a relay forwards frames to
pub trait FrameSink: Send + Sync + 'static {
    /// Deliver one frame, returning the bytes written
    fn send<'a>(&'a self, frame: &'a Frame) -> SendFuture<'a>;
}
