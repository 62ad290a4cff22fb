//! Transport session adapter
//!
//! Wraps a multiplexed session (see [`Session`]) in a fixed role:
//!
//! ```text
//!   publisher peer                          subscriber peer
//!        │ uni streams                            ▲ uni streams
//!        ▼                                        │
//!   Transport<S, Publisher>               Transport<S, Subscriber>
//!   accept_loop()                         send(frame)
//!     └─ per-stream FramedRead task         └─ open, write, close (5 s deadline)
//! ```
//!
//! Every frame travels on its own unidirectional stream, so stream close acts
//! as a second end-of-frame marker next to the length prefix. Inbound streams
//! carrying several frames back to back are accepted as well.

pub mod adapter;
pub mod config;
pub mod memory;
pub mod session;

pub use adapter::{
    Direction, DirectionKind, Publisher, PublisherTransport, Subscriber, SubscriberTransport,
    Transport,
};
pub use config::{TransportConfig, DEFAULT_SEND_TIMEOUT};
pub use memory::MemorySession;
pub use session::Session;

pub(crate) use adapter::send_frame;
