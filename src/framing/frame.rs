//! Frame type and wire encoding

use bytes::Bytes;

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size (256 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 18;

/// One complete application message
///
/// Cheap to clone: the payload is reference counted and shared between all
/// subscribers a frame is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Create a frame from a payload
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Frame payload
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the frame, returning its payload
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Length prefix as it appears on the wire
    ///
    /// Payloads longer than `u32::MAX` cannot be framed; `None` in that case.
    pub fn length_prefix(&self) -> Option<[u8; LENGTH_PREFIX_SIZE]> {
        u32::try_from(self.payload.len())
            .ok()
            .map(u32::to_le_bytes)
    }

    /// Total size on the wire (prefix + payload)
    pub fn encoded_len(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.payload.len()
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

impl From<Vec<u8>> for Frame {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}
