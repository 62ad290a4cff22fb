//! Error types
//!
//! Errors are split by where they stop propagating:
//!
//! - [`ConnectionError`]: session or stream failures in the transport adapter
//! - [`FramingError`]: malformed or truncated frames on one inbound stream
//! - [`RegistryError`]: rejected publish/subscribe requests
//! - [`DeliveryError`]: a failed send to one subscriber
//! - [`ConfigError`]: invalid bootstrap parameters

use std::fmt;
use std::io;
use std::time::Duration;

pub use crate::registry::error::RegistryError;
use crate::registry::SubscriberId;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Transport session or stream failure
    Connection(ConnectionError),
    /// Frame decoding failure
    Framing(FramingError),
    /// Publish/subscribe rejection
    Registry(RegistryError),
    /// Failed delivery to a single subscriber
    Delivery(DeliveryError),
    /// Invalid configuration
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Framing(e) => write!(f, "Framing error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Delivery(e) => write!(f, "Delivery error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => Some(e),
            Error::Framing(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Delivery(e) => Some(e),
            Error::Config(e) => Some(e),
        }
    }
}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Connection(e)
    }
}

impl From<FramingError> for Error {
    fn from(e: FramingError) -> Self {
        Error::Framing(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<DeliveryError> for Error {
    fn from(e: DeliveryError) -> Self {
        Error::Delivery(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// Transport-level failures
#[derive(Debug)]
pub enum ConnectionError {
    /// Open + write + close of an outbound stream exceeded the deadline
    Timeout(Duration),
    /// The session is already closed
    SessionClosed,
    /// Accepting an inbound stream failed
    Accept(io::Error),
    /// Opening an outbound stream failed
    Open(io::Error),
    /// Writing or finishing an outbound stream failed
    Write(io::Error),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Timeout(d) => write!(f, "Send deadline of {:?} exceeded", d),
            ConnectionError::SessionClosed => write!(f, "Session closed"),
            ConnectionError::Accept(e) => write!(f, "Failed to accept stream: {}", e),
            ConnectionError::Open(e) => write!(f, "Failed to open stream: {}", e),
            ConnectionError::Write(e) => write!(f, "Failed to write stream: {}", e),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Accept(e) | ConnectionError::Open(e) | ConnectionError::Write(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

/// Frame decoding failures
///
/// Each of these aborts the reassembler of the stream it happened on and
/// nothing else.
#[derive(Debug)]
pub enum FramingError {
    /// Declared payload length exceeds the working buffer
    FrameTooLarge { declared: usize, max: usize },
    /// Stream ended inside the 4-byte length prefix
    TruncatedPrefix { received: usize },
    /// Stream ended before the declared payload length arrived
    TruncatedPayload { received: usize, expected: usize },
    /// Reading from the stream failed
    Read(io::Error),
}

impl From<io::Error> for FramingError {
    fn from(e: io::Error) -> Self {
        FramingError::Read(e)
    }
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingError::FrameTooLarge { declared, max } => {
                write!(f, "Frame of {} bytes exceeds maximum of {}", declared, max)
            }
            FramingError::TruncatedPrefix { received } => {
                write!(f, "Stream ended after {} of 4 length prefix bytes", received)
            }
            FramingError::TruncatedPayload { received, expected } => {
                write!(
                    f,
                    "Stream ended after {} of {} payload bytes",
                    received, expected
                )
            }
            FramingError::Read(e) => write!(f, "Read failed: {}", e),
        }
    }
}

impl std::error::Error for FramingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FramingError::Read(e) => Some(e),
            _ => None,
        }
    }
}

/// A frame that could not be delivered to one subscriber
#[derive(Debug)]
pub struct DeliveryError {
    /// The subscriber that failed
    pub subscriber: SubscriberId,
    /// Underlying transport failure
    pub source: ConnectionError,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscriber {}: {}", self.subscriber, self.source)
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// TLS certificate and key must both be supplied
    MissingTls,
    /// A value could not be parsed
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingTls => {
                write!(f, "Both a TLS certificate and a TLS key are required")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
