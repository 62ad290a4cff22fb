//! Transport configuration

use std::time::Duration;

use crate::framing::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_CHUNK_SIZE};

/// Default deadline for open + write + close of one outbound stream
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-session transport options
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline covering open, write and close of one outbound frame stream
    pub send_timeout: Duration,

    /// Largest accepted frame payload
    pub max_frame_size: usize,

    /// Initial read buffer size of each inbound stream
    pub read_chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl TransportConfig {
    /// Set the outbound send deadline
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the maximum frame payload size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the inbound read buffer size (at least 1 byte)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();

        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert_eq!(config.max_frame_size, 1 << 18);
        assert_eq!(config.read_chunk_size, 4096);
    }

    #[test]
    fn test_builder_chaining() {
        let config = TransportConfig::default()
            .send_timeout(Duration::from_millis(250))
            .max_frame_size(1024)
            .read_chunk_size(0);

        assert_eq!(config.send_timeout, Duration::from_millis(250));
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.read_chunk_size, 1);
    }
}
