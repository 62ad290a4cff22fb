//! Publisher-side receive endpoint

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ConnectionError;
use crate::framing::Frame;
use crate::transport::{PublisherTransport, Session};

/// Capacity of the reassembler → relay hand-off
///
/// One slot, the smallest tokio allows: a reassembler waits until the relay
/// took the previous frame, which pushes backpressure down to the network read.
pub const HANDOFF_CAPACITY: usize = 1;

type CloseFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type CloseCallback = Box<dyn FnOnce() -> CloseFuture + Send>;

/// Source of frames from one publishing session
pub struct ReceiveEndpoint {
    session_id: u64,
    frames: mpsc::Receiver<Frame>,
    on_close: Option<CloseCallback>,
    accept_task: Option<JoinHandle<Result<(), ConnectionError>>>,
}

impl ReceiveEndpoint {
    /// Start the transport's accept loop and expose its frames
    pub fn new<S: Session>(transport: PublisherTransport<S>) -> Self {
        let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
        let session_id = transport.session_id();
        let accept_task = tokio::spawn(transport.accept_loop(tx));

        Self {
            session_id,
            frames: rx,
            on_close: None,
            accept_task: Some(accept_task),
        }
    }

    /// Build an endpoint over an existing frame channel
    pub fn from_receiver(session_id: u64, frames: mpsc::Receiver<Frame>) -> Self {
        Self {
            session_id,
            frames,
            on_close: None,
            accept_task: None,
        }
    }

    /// Create an endpoint together with the sender feeding it
    pub fn channel(session_id: u64) -> (mpsc::Sender<Frame>, Self) {
        let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
        (tx, Self::from_receiver(session_id, rx))
    }

    /// Session this endpoint reads from
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Register the callback run once the frame sequence has ended
    ///
    /// Replaces any earlier callback.
    pub fn on_close<F, Fut>(&mut self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_close = Some(Box::new(move || Box::pin(callback()) as CloseFuture));
    }

    /// Next frame, or `None` once the publisher is gone
    pub async fn recv(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Stop accepting and run the disconnect callback
    pub async fn close(mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        if let Some(callback) = self.on_close.take() {
            callback().await;
        }
    }
}

impl Drop for ReceiveEndpoint {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ReceiveEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveEndpoint")
            .field("session_id", &self.session_id)
            .field("has_on_close", &self.on_close.is_some())
            .finish()
    }
}
