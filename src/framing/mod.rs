//! Length-delimited frame codec
//!
//! Every frame on the wire is a 4-byte little-endian length `L` followed by
//! exactly `L` payload bytes:
//!
//! ```text
//! +----------------+---------------------------+
//! | L (u32, LE)    | payload (L bytes)         |
//! +----------------+---------------------------+
//! ```
//!
//! The transport may deliver those bytes in reads of any size. [`Reassembler`]
//! is the decoder that stitches them back together; it implements
//! `tokio_util::codec::Decoder`, so an inbound stream is read with
//! `FramedRead`. [`FrameEncoder`] writes frames through `FramedWrite`.
//!
//! # Buffer handoff
//!
//! Completed payloads are split off the reassembler's [`FrameArena`] as frozen
//! `Bytes`. The consumer owns that view; the producer keeps filling the rest of
//! the same allocation and reclaims it once every consumer dropped its frame,
//! so steady-state decoding does not allocate per frame. Arenas come from a
//! per-session [`ArenaPool`] and grow only to the frames they carry.

pub mod arena;
pub mod codec;
pub mod frame;
pub mod reassembler;

pub use arena::{ArenaPool, BufferState, FrameArena};
pub use codec::{FrameEncoder, DEFAULT_READ_CHUNK_SIZE};
pub use frame::{Frame, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE};
pub use reassembler::Reassembler;
