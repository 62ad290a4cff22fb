//! Statistics for relays and subscribers

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::registry::{StreamKey, SubscriberId};

/// Frame, byte and failure counters updated from concurrent tasks
#[derive(Debug, Default)]
pub struct FrameCounters {
    frames: AtomicU64,
    bytes: AtomicU64,
    failures: AtomicU64,
}

impl FrameCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame of `bytes` bytes
    pub fn record_frame(&self, bytes: usize) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Count one failed delivery
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Snapshot of one subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberStats {
    /// Subscriber identifier within its relay
    pub id: SubscriberId,
    /// Frames delivered
    pub frames_sent: u64,
    /// Bytes delivered (length prefixes included)
    pub bytes_sent: u64,
    /// Failed deliveries
    pub failures: u64,
}

/// Snapshot of one relay
#[derive(Debug, Clone)]
pub struct RelayStats {
    /// Stream the relay serves
    pub stream_key: StreamKey,
    /// Session id of the bound publisher, if any
    pub publisher_id: Option<u64>,
    /// Frames forwarded from the publisher
    pub frames_forwarded: u64,
    /// Payload bytes forwarded from the publisher
    pub bytes_forwarded: u64,
    /// Failed deliveries across all subscribers
    pub delivery_failures: u64,
    /// Time since the relay was created
    pub age: Duration,
    /// Per-subscriber snapshots in registration order
    pub subscribers: Vec<SubscriberStats>,
}

impl RelayStats {
    /// Number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether a publisher is bound
    pub fn has_publisher(&self) -> bool {
        self.publisher_id.is_some()
    }

    /// Ingest bitrate in bits per second over the relay's lifetime
    pub fn bitrate(&self) -> u64 {
        let secs = self.age.as_secs();
        if secs > 0 {
            (self.bytes_forwarded * 8) / secs
        } else {
            0
        }
    }
}
