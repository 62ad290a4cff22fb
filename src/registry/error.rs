//! Registry error types
//!
//! Error types for publish/subscribe requests against the stream registry.

use super::key::StreamKey;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No publisher registered for the stream
    StreamNotFound(StreamKey),
    /// Stream already has a publisher
    PublisherExists(StreamKey),
}

impl RegistryError {
    /// Stream the request was for
    pub fn key(&self) -> &StreamKey {
        match self {
            RegistryError::StreamNotFound(key) | RegistryError::PublisherExists(key) => key,
        }
    }

    /// HTTP status a request router should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::StreamNotFound(_) => 404,
            RegistryError::PublisherExists(_) => 409,
        }
    }
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNotFound(key) => write!(f, "Stream not found: {}", key),
            RegistryError::PublisherExists(key) => {
                write!(f, "Publisher already exists: {}", key)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let key = StreamKey::new("cam");
        assert_eq!(RegistryError::StreamNotFound(key.clone()).status_code(), 404);
        assert_eq!(RegistryError::PublisherExists(key).status_code(), 409);
    }

    #[test]
    fn test_display() {
        let err = RegistryError::PublisherExists(StreamKey::new("cam"));
        assert_eq!(err.to_string(), "Publisher already exists: cam");
        assert_eq!(err.key().as_str(), "cam");
    }
}
