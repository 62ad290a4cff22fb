//! Frame publisher
//!
//! Sends frames into a relay over a session accepted as publisher.

use std::time::Duration;

use bytes::Bytes;
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::error::ConnectionError;
use crate::framing::{Frame, FrameEncoder};
use crate::transport::{send_frame, Session, TransportConfig};

/// Publishing side of a session
///
/// # Example
/// ```no_run
/// use relay_rs::client::FramePublisher;
/// use relay_rs::transport::MemorySession;
///
/// # async fn example() -> Result<(), relay_rs::error::ConnectionError> {
/// let (_server_side, client_side) = MemorySession::pair();
/// let publisher = FramePublisher::new(client_side);
///
/// publisher.send(vec![0u8; 100]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FramePublisher<S> {
    session: S,
    config: TransportConfig,
}

impl<S: Session> FramePublisher<S> {
    /// Create a publisher with the default send deadline and frame limit
    pub fn new(session: S) -> Self {
        Self {
            session,
            config: TransportConfig::default(),
        }
    }

    /// Set the deadline for one [`send`](Self::send)
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    /// Refuse to send frames larger than `size`
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Send one frame on its own stream
    ///
    /// Returns bytes written, length prefix included.
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<usize, ConnectionError> {
        let frame = Frame::new(payload);
        send_frame(&self.session, &frame, &self.config).await
    }

    /// Open a stream that carries several frames back to back
    ///
    /// Frames written to one stream keep their order through the relay.
    /// No deadline applies to the returned writer.
    pub async fn open_stream(&self) -> Result<FrameWriter<S::SendStream>, ConnectionError> {
        if self.session.is_closed() {
            return Err(ConnectionError::SessionClosed);
        }

        let stream = self
            .session
            .open_uni()
            .await
            .map_err(ConnectionError::Open)?;

        Ok(FrameWriter {
            sink: FramedWrite::new(stream, FrameEncoder::new(self.config.max_frame_size)),
            frames_written: 0,
        })
    }
}

/// Writes length-prefixed frames to one outbound stream
#[derive(Debug)]
pub struct FrameWriter<W> {
    sink: FramedWrite<W, FrameEncoder>,
    frames_written: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Write and flush one frame, returning bytes written
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<usize, ConnectionError> {
        self.sink
            .send(frame.clone())
            .await
            .map_err(ConnectionError::Write)?;
        self.frames_written += 1;
        Ok(frame.encoded_len())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close the stream; the relay sees a clean end after the last frame
    pub async fn finish(mut self) -> Result<u64, ConnectionError> {
        self.sink.close().await.map_err(ConnectionError::Write)?;
        Ok(self.frames_written)
    }
}
