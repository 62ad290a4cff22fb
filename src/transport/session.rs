//! Multiplexed session capability

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

/// A multiplexed transport session carrying unidirectional byte streams
///
/// This is the seam to the underlying transport library (WebTransport, QUIC,
/// yamux, ...). Handles are cheap to clone and refer to the same session.
pub trait Session: Clone + Send + Sync + 'static {
    /// Inbound unidirectional stream
    type RecvStream: AsyncRead + Unpin + Send + 'static;
    /// Outbound unidirectional stream
    type SendStream: AsyncWrite + Unpin + Send + 'static;

    /// Wait for the peer to open the next unidirectional stream
    fn accept_uni(&self) -> impl Future<Output = io::Result<Self::RecvStream>> + Send;

    /// Open a new unidirectional stream towards the peer
    fn open_uni(&self) -> impl Future<Output = io::Result<Self::SendStream>> + Send;

    /// Resolves once the session has been closed by either side
    fn closed(&self) -> impl Future<Output = ()> + Send;

    /// Whether the session has been closed
    fn is_closed(&self) -> bool;
}
