//! Role-typed transport session adapter
//!
//! A [`Transport`] wraps one session in a fixed role. The role is a type
//! parameter, so only a publisher transport can run the accept loop and only
//! a subscriber transport can send frames.

use std::marker::PhantomData;

use futures::{SinkExt, StreamExt};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use super::config::TransportConfig;
use super::session::Session;
use crate::error::ConnectionError;
use crate::framing::{ArenaPool, Frame, FrameEncoder, Reassembler};

/// Runtime view of a transport's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionKind {
    /// Peer publishes frames into the relay
    Publisher,
    /// Peer receives frames from the relay
    Subscriber,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Publisher {}
    impl Sealed for super::Subscriber {}
}

/// Role marker for [`Transport`]
pub trait Direction: sealed::Sealed + Send + Sync + 'static {
    const KIND: DirectionKind;
}

/// Inbound role: accepts streams and reassembles frames
#[derive(Debug, Clone, Copy)]
pub struct Publisher;

/// Outbound role: sends each frame on a new stream
#[derive(Debug, Clone, Copy)]
pub struct Subscriber;

impl Direction for Publisher {
    const KIND: DirectionKind = DirectionKind::Publisher;
}

impl Direction for Subscriber {
    const KIND: DirectionKind = DirectionKind::Subscriber;
}

/// Session adapter in a fixed role
#[derive(Debug)]
pub struct Transport<S, D> {
    session: S,
    session_id: u64,
    config: TransportConfig,
    _direction: PhantomData<fn() -> D>,
}

/// Adapter for a publishing session
pub type PublisherTransport<S> = Transport<S, Publisher>;

/// Adapter for a subscribing session
pub type SubscriberTransport<S> = Transport<S, Subscriber>;

impl<S: Session, D: Direction> Transport<S, D> {
    /// Wrap `session` in role `D`
    pub fn new(session: S, session_id: u64, config: TransportConfig) -> Self {
        Self {
            session,
            session_id,
            config,
            _direction: PhantomData,
        }
    }

    /// Role of this adapter
    pub fn direction(&self) -> DirectionKind {
        D::KIND
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl<S: Session> Transport<S, Publisher> {
    /// Accept inbound streams until the session closes
    ///
    /// Each accepted stream gets its own reassembler task feeding `frames`.
    /// Those tasks are not cancelled when the loop ends; they finish on their
    /// own at stream end or on the next read error. The loop also stops once
    /// the receiving side of `frames` is gone.
    ///
    /// Reassemblers of one session share an [`ArenaPool`].
    pub async fn accept_loop(self, frames: mpsc::Sender<Frame>) -> Result<(), ConnectionError> {
        let arenas = ArenaPool::new(self.config.max_frame_size);
        let mut accepted: u64 = 0;

        loop {
            let stream = tokio::select! {
                biased;
                _ = self.session.closed() => {
                    tracing::debug!(
                        session_id = self.session_id,
                        streams = accepted,
                        "Session closed, accept loop finished"
                    );
                    return Ok(());
                }
                _ = frames.closed() => {
                    tracing::debug!(
                        session_id = self.session_id,
                        "Frame consumer gone, accept loop finished"
                    );
                    return Ok(());
                }
                result = self.session.accept_uni() => match result {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::error!(
                            session_id = self.session_id,
                            error = %e,
                            "Failed to accept stream"
                        );
                        return Err(ConnectionError::Accept(e));
                    }
                },
            };

            accepted += 1;
            tracing::debug!(
                session_id = self.session_id,
                inbound_stream = accepted,
                "Accepted inbound stream"
            );

            let reader = FramedRead::with_capacity(
                stream,
                Reassembler::from_pool(&arenas),
                self.config.read_chunk_size,
            );
            tokio::spawn(reassemble(
                reader,
                frames.clone(),
                self.session_id,
                accepted,
            ));
        }
    }
}

impl<S: Session> Transport<S, Subscriber> {
    /// Send one frame on a new outbound stream
    ///
    /// Open, write and close share one deadline. Returns bytes written,
    /// length prefix included.
    pub async fn send(&self, frame: &Frame) -> Result<usize, ConnectionError> {
        send_frame(&self.session, frame, &self.config).await
    }
}

/// Open a stream on `session`, write `frame` and close the stream
///
/// Frames larger than `config.max_frame_size` fail with
/// [`ConnectionError::Write`] before anything is written.
pub(crate) async fn send_frame<S: Session>(
    session: &S,
    frame: &Frame,
    config: &TransportConfig,
) -> Result<usize, ConnectionError> {
    if session.is_closed() {
        return Err(ConnectionError::SessionClosed);
    }

    let deadline = config.send_timeout;
    let send = async {
        let stream = session.open_uni().await.map_err(ConnectionError::Open)?;
        let mut sink = FramedWrite::new(stream, FrameEncoder::new(config.max_frame_size));
        sink.send(frame.clone()).await.map_err(ConnectionError::Write)?;
        sink.close().await.map_err(ConnectionError::Write)?;
        Ok(frame.encoded_len())
    };

    match tokio::time::timeout(deadline, send).await {
        Ok(result) => result,
        Err(_) => Err(ConnectionError::Timeout(deadline)),
    }
}

/// Drain one inbound stream into `frames`
async fn reassemble<R>(
    mut reader: FramedRead<R, Reassembler>,
    frames: mpsc::Sender<Frame>,
    session_id: u64,
    inbound_stream: u64,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.next().await {
            Some(Ok(frame)) => {
                tracing::trace!(
                    session_id = session_id,
                    inbound_stream = inbound_stream,
                    len = frame.len(),
                    "Frame reassembled"
                );
                if frames.send(frame).await.is_err() {
                    return;
                }
            }
            None => {
                tracing::debug!(
                    session_id = session_id,
                    inbound_stream = inbound_stream,
                    frames = reader.decoder().frames_completed(),
                    "Inbound stream finished"
                );
                return;
            }
            Some(Err(e)) => {
                let discarded = reader.decoder_mut().reset();
                tracing::warn!(
                    session_id = session_id,
                    inbound_stream = inbound_stream,
                    discarded = discarded,
                    error = %e,
                    "Inbound stream aborted"
                );
                return;
            }
        }
    }
}
