//! Frame subscriber
//!
//! Receives relayed frames over a session registered as subscriber. The relay
//! opens one stream per frame; streams are read one at a time in the order
//! they were accepted, so frames come out in the order the relay sent them.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

use crate::framing::{
    ArenaPool, Frame, Reassembler, DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_CHUNK_SIZE,
};
use crate::transport::Session;

/// Frames buffered between the reader task and [`FrameSubscriber::recv`]
const RECEIVE_BUFFER: usize = 64;

/// Receiving side of a session
#[derive(Debug)]
pub struct FrameSubscriber {
    frames: mpsc::Receiver<Frame>,
    task: JoinHandle<()>,
}

impl FrameSubscriber {
    /// Start reading relayed frames from `session`
    pub fn new<S: Session>(session: S) -> Self {
        Self::with_max_frame_size(session, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Start reading, rejecting frames larger than `max_frame_size`
    pub fn with_max_frame_size<S: Session>(session: S, max_frame_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(RECEIVE_BUFFER);
        let task = tokio::spawn(read_streams(session, tx, max_frame_size));

        Self { frames: rx, task }
    }

    /// Next relayed frame, or `None` once the session is closed
    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }
}

impl Drop for FrameSubscriber {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_streams<S: Session>(
    session: S,
    frames: mpsc::Sender<Frame>,
    max_frame_size: usize,
) {
    let arenas = ArenaPool::new(max_frame_size);

    loop {
        let stream = tokio::select! {
            biased;
            _ = session.closed() => return,
            _ = frames.closed() => return,
            result = session.accept_uni() => match result {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::debug!(error = %e, "Subscriber accept ended");
                    return;
                }
            },
        };

        let mut reader = FramedRead::with_capacity(
            stream,
            Reassembler::from_pool(&arenas),
            DEFAULT_READ_CHUNK_SIZE,
        );
        while let Some(result) = reader.next().await {
            match result {
                Ok(frame) => {
                    if frames.send(frame).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed relayed stream");
                    break;
                }
            }
        }
    }
}
