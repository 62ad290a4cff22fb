//! In-memory session pair
//!
//! Two connected [`MemorySession`] handles: a stream opened on one side is
//! accepted on the other. Streams are backed by `tokio::io::duplex`, so they
//! behave like real network streams (bounded buffering, EOF on shutdown).
//! Closing either side closes the whole session, which makes it easy to
//! simulate a peer going away.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::DuplexStream;
use tokio::sync::{mpsc, watch, Mutex};

use super::session::Session;

/// Default per-stream buffer capacity (64 KiB)
pub const DEFAULT_STREAM_CAPACITY: usize = 64 * 1024;

/// One side of an in-memory session
#[derive(Debug, Clone)]
pub struct MemorySession {
    inner: Arc<Endpoint>,
}

#[derive(Debug)]
struct Endpoint {
    incoming: Mutex<mpsc::UnboundedReceiver<DuplexStream>>,
    outgoing: mpsc::UnboundedSender<DuplexStream>,
    closed: Arc<watch::Sender<bool>>,
    stream_capacity: usize,
}

impl MemorySession {
    /// Create a connected pair of sessions
    pub fn pair() -> (Self, Self) {
        Self::pair_with_capacity(DEFAULT_STREAM_CAPACITY)
    }

    /// Create a connected pair with a custom per-stream buffer capacity
    pub fn pair_with_capacity(stream_capacity: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let closed = Arc::new(closed);

        let a = Endpoint {
            incoming: Mutex::new(a_rx),
            outgoing: b_tx,
            closed: Arc::clone(&closed),
            stream_capacity,
        };
        let b = Endpoint {
            incoming: Mutex::new(b_rx),
            outgoing: a_tx,
            closed,
            stream_capacity,
        };

        (
            Self { inner: Arc::new(a) },
            Self { inner: Arc::new(b) },
        )
    }

    /// Close the session for both sides
    ///
    /// Pending and future accepts fail, and no new streams can be opened.
    /// Streams already open keep working until their writers finish.
    pub fn close(&self) {
        self.inner.closed.send_replace(true);
    }
}

impl Session for MemorySession {
    type RecvStream = DuplexStream;
    type SendStream = DuplexStream;

    fn accept_uni(&self) -> impl Future<Output = io::Result<DuplexStream>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let closed = inner.closed.subscribe();
            let mut incoming = inner.incoming.lock().await;

            tokio::select! {
                biased;
                _ = wait_closed(closed) => Err(session_closed()),
                stream = incoming.recv() => stream.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::ConnectionReset, "peer session dropped")
                }),
            }
        }
    }

    fn open_uni(&self) -> impl Future<Output = io::Result<DuplexStream>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let is_closed = *inner.closed.borrow();
            if is_closed {
                return Err(session_closed());
            }

            let (local, remote) = tokio::io::duplex(inner.stream_capacity);
            inner.outgoing.send(remote).map_err(|_| {
                io::Error::new(io::ErrorKind::BrokenPipe, "peer session dropped")
            })?;
            Ok(local)
        }
    }

    fn closed(&self) -> impl Future<Output = ()> + Send {
        wait_closed(self.inner.closed.subscribe())
    }

    fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }
}

async fn wait_closed(mut rx: watch::Receiver<bool>) {
    loop {
        let closed = *rx.borrow_and_update();
        if closed || rx.changed().await.is_err() {
            return;
        }
    }
}

fn session_closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "session closed")
}
