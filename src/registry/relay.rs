//! Per-stream fan-out unit
//!
//! A relay binds at most one publisher frame source to a growing set of
//! subscriber sinks. Frames are forwarded one at a time: delivery to every
//! subscriber completes before the next frame from the publisher starts.
//!
//! The subscriber set is copy-on-write. `subscribe` swaps in a new list under
//! the write lock; `forward` clones the current `Arc` and iterates that
//! snapshot, so a subscriber added mid-frame starts with the next frame.
//!
//! Forwarding is sequential, so one slow subscriber delays every subscriber
//! registered after it until its send deadline expires.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::error::RegistryError;
use super::key::StreamKey;
use crate::endpoint::{FrameSink, ReceiveEndpoint};
use crate::error::DeliveryError;
use crate::framing::Frame;
use crate::stats::{FrameCounters, RelayStats, SubscriberStats};

/// Identifier of a subscriber within its relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscriber {
    id: SubscriberId,
    sink: Arc<dyn FrameSink>,
    counters: FrameCounters,
}

impl Subscriber {
    fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            id: self.id,
            frames_sent: self.counters.frames(),
            bytes_sent: self.counters.bytes(),
            failures: self.counters.failures(),
        }
    }
}

/// Outcome of forwarding one frame
#[derive(Debug, Default)]
pub struct ForwardReport {
    /// Subscribers the frame reached
    pub delivered: usize,
    /// Subscribers the frame could not reach
    pub failures: Vec<DeliveryError>,
}

impl ForwardReport {
    /// True if every subscriber received the frame
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of subscribers a delivery was attempted to
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Fan-out of one publisher to many subscribers
pub struct Relay {
    key: StreamKey,
    publisher_bound: AtomicBool,
    publisher_id: AtomicU64,
    subscribers: RwLock<Arc<Vec<Arc<Subscriber>>>>,
    next_subscriber_id: AtomicU64,
    counters: FrameCounters,
    created_at: Instant,
}

impl Relay {
    /// Create an empty relay for `key`
    pub fn new(key: StreamKey) -> Self {
        Self {
            key,
            publisher_bound: AtomicBool::new(false),
            publisher_id: AtomicU64::new(0),
            subscribers: RwLock::new(Arc::new(Vec::new())),
            next_subscriber_id: AtomicU64::new(1),
            counters: FrameCounters::new(),
            created_at: Instant::now(),
        }
    }

    /// Stream this relay serves
    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Session id of the bound publisher
    pub fn publisher_id(&self) -> Option<u64> {
        if self.publisher_bound.load(Ordering::Acquire) {
            Some(self.publisher_id.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Whether a publisher is bound
    pub fn has_publisher(&self) -> bool {
        self.publisher_bound.load(Ordering::Acquire)
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Bind the publisher and start the broadcast task
    ///
    /// The task forwards every frame from `source` until its sequence ends,
    /// then runs the source's close callback and unbinds the publisher.
    /// Fails if a publisher is already bound; the source is dropped without
    /// running its callback in that case.
    pub fn publish(
        self: &Arc<Self>,
        source: ReceiveEndpoint,
    ) -> Result<JoinHandle<()>, RegistryError> {
        if self
            .publisher_bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(
                stream = %self.key,
                session_id = source.session_id(),
                "Publisher rejected, stream already has one"
            );
            return Err(RegistryError::PublisherExists(self.key.clone()));
        }

        let session_id = source.session_id();
        self.publisher_id.store(session_id, Ordering::Release);

        tracing::info!(stream = %self.key, session_id = session_id, "Publisher bound");

        let relay = Arc::clone(self);
        let mut source = source;
        Ok(tokio::spawn(async move {
            while let Some(frame) = source.recv().await {
                relay.forward(&frame).await;
            }

            tracing::info!(
                stream = %relay.key,
                session_id = session_id,
                frames = relay.counters.frames(),
                bytes = relay.counters.bytes(),
                "Publisher disconnected"
            );

            // Unbind only once the close callback has unregistered the relay
            source.close().await;
            relay.publisher_bound.store(false, Ordering::Release);
        }))
    }

    /// Add a subscriber; it receives frames forwarded from now on
    pub async fn subscribe(&self, sink: Arc<dyn FrameSink>) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber {
            id,
            sink,
            counters: FrameCounters::new(),
        });

        let mut subscribers = self.subscribers.write().await;
        let mut next = Vec::with_capacity(subscribers.len() + 1);
        next.extend(subscribers.iter().cloned());
        next.push(subscriber);
        *subscribers = Arc::new(next);

        tracing::debug!(
            stream = %self.key,
            subscriber = %id,
            subscribers = subscribers.len(),
            "Subscriber added"
        );

        id
    }

    /// Deliver `frame` to every current subscriber in registration order
    ///
    /// A failed delivery is counted and logged, then the next subscriber is
    /// served. Failures never reach the publisher.
    pub async fn forward(&self, frame: &Frame) -> ForwardReport {
        let subscribers = Arc::clone(&*self.subscribers.read().await);
        self.counters.record_frame(frame.len());

        let mut report = ForwardReport::default();
        for subscriber in subscribers.iter() {
            match subscriber.sink.send(frame).await {
                Ok(written) => {
                    subscriber.counters.record_frame(written);
                    report.delivered += 1;
                }
                Err(source) => {
                    subscriber.counters.record_failure();
                    self.counters.record_failure();
                    tracing::warn!(
                        stream = %self.key,
                        subscriber = %subscriber.id,
                        error = %source,
                        "Frame delivery failed"
                    );
                    report.failures.push(DeliveryError {
                        subscriber: subscriber.id,
                        source,
                    });
                }
            }
        }

        tracing::trace!(
            stream = %self.key,
            len = frame.len(),
            delivered = report.delivered,
            failed = report.failures.len(),
            "Frame forwarded"
        );

        report
    }

    /// Snapshot of relay and subscriber counters
    pub async fn stats(&self) -> RelayStats {
        let subscribers = Arc::clone(&*self.subscribers.read().await);

        RelayStats {
            stream_key: self.key.clone(),
            publisher_id: self.publisher_id(),
            frames_forwarded: self.counters.frames(),
            bytes_forwarded: self.counters.bytes(),
            delivery_failures: self.counters.failures(),
            age: self.created_at.elapsed(),
            subscribers: subscribers.iter().map(|s| s.stats()).collect(),
        }
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("key", &self.key)
            .field("publisher_id", &self.publisher_id())
            .finish()
    }
}
