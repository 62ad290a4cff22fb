//! Client-side helpers
//!
//! Provides the peer side of a relay session:
//! - Publishing frames into a relay, one per stream or several on one stream
//! - Receiving relayed frames in order

pub mod publisher;
pub mod subscriber;

pub use publisher::{FramePublisher, FrameWriter};
pub use subscriber::FrameSubscriber;
