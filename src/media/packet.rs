//! Packet metadata record
//!
//! Describes one media packet by its synchronization source and kind. The
//! relay forwards opaque frames and never builds or inspects these; the type
//! is reserved for per-source routing.

use std::str::FromStr;
use std::time::Instant;

use bytes::Bytes;

/// Media kind of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised media kind string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMediaKind(pub String);

impl std::fmt::Display for UnknownMediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown media kind: {:?}", self.0)
    }
}

impl std::error::Error for UnknownMediaKind {}

impl FromStr for MediaKind {
    type Err = UnknownMediaKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            other => Err(UnknownMediaKind(other.to_string())),
        }
    }
}

/// Metadata of one received media packet
#[derive(Debug, Clone)]
pub struct PacketMeta {
    /// Synchronization source identifier
    pub ssrc: u32,
    /// Audio or video
    pub kind: MediaKind,
    /// Raw packet payload
    pub payload: Bytes,
    /// When the packet arrived
    pub arrival: Instant,
}

impl PacketMeta {
    /// Record a packet arriving now
    pub fn new(ssrc: u32, kind: MediaKind, payload: impl Into<Bytes>) -> Self {
        Self {
            ssrc,
            kind,
            payload: payload.into(),
            arrival: Instant::now(),
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
