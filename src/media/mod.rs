//! Media metadata
//!
//! Packet metadata reserved for routing by synchronization source and media
//! kind. Not used by the forwarding path, which treats frames as opaque.

pub mod packet;

pub use packet::{MediaKind, PacketMeta, UnknownMediaKind};
