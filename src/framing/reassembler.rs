//! Sans-IO frame reassembler
//!
//! Tracks `bytes_buffered` against `bytes_required` for the frame in progress.
//! The length prefix itself may arrive split across reads; it is collected
//! byte by byte until all four are present.
//!
//! The `tokio_util` [`Decoder`](tokio_util::codec::Decoder) implementation
//! lives in [`codec`](super::codec).

use bytes::Buf;

use super::arena::{ArenaPool, FrameArena};
use super::frame::{Frame, LENGTH_PREFIX_SIZE};
use crate::error::FramingError;

#[derive(Debug, Clone, Copy)]
enum DecodeState {
    /// Collecting the length prefix
    Prefix {
        buffered: usize,
        bytes: [u8; LENGTH_PREFIX_SIZE],
    },
    /// Collecting `required` payload bytes into the arena
    Payload { required: usize },
}

impl DecodeState {
    fn start() -> Self {
        DecodeState::Prefix {
            buffered: 0,
            bytes: [0; LENGTH_PREFIX_SIZE],
        }
    }
}

/// Stateful decoder for length-delimited frames
#[derive(Debug)]
pub struct Reassembler {
    state: DecodeState,
    arena: FrameArena,
    pool: Option<ArenaPool>,
    frames_completed: u64,
}

impl Reassembler {
    /// Create a reassembler accepting payloads of up to `max_frame_size` bytes
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            state: DecodeState::start(),
            arena: FrameArena::new(max_frame_size),
            pool: None,
            frames_completed: 0,
        }
    }

    /// Create a reassembler working in an arena taken from `pool`
    ///
    /// The arena goes back to the pool when the reassembler is dropped.
    pub fn from_pool(pool: &ArenaPool) -> Self {
        Self {
            state: DecodeState::start(),
            arena: pool.acquire(),
            pool: Some(pool.clone()),
            frames_completed: 0,
        }
    }

    /// Largest payload accepted
    pub fn max_frame_size(&self) -> usize {
        self.arena.max_frame_size()
    }

    /// Bytes of the frame in progress received so far (prefix or payload)
    pub fn bytes_buffered(&self) -> usize {
        match self.state {
            DecodeState::Prefix { buffered, .. } => buffered,
            DecodeState::Payload { .. } => self.arena.len(),
        }
    }

    /// Bytes the current stage needs in total (4 while reading the prefix)
    pub fn bytes_required(&self) -> usize {
        match self.state {
            DecodeState::Prefix { .. } => LENGTH_PREFIX_SIZE,
            DecodeState::Payload { required } => required,
        }
    }

    /// True when positioned exactly on a frame boundary
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecodeState::Prefix { buffered: 0, .. })
    }

    /// Number of frames emitted so far
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Consume bytes from `src` until one frame completes or `src` runs dry
    ///
    /// Bytes past the end of a completed frame are left in `src`, so call again
    /// to continue with the next frame.
    pub fn decode_buf<B: Buf>(&mut self, src: &mut B) -> Result<Option<Frame>, FramingError> {
        loop {
            match self.state {
                DecodeState::Prefix {
                    mut buffered,
                    mut bytes,
                } => {
                    let n = (LENGTH_PREFIX_SIZE - buffered).min(src.remaining());
                    src.copy_to_slice(&mut bytes[buffered..buffered + n]);
                    buffered += n;

                    if buffered < LENGTH_PREFIX_SIZE {
                        self.state = DecodeState::Prefix { buffered, bytes };
                        return Ok(None);
                    }

                    let required = u32::from_le_bytes(bytes) as usize;
                    if required > self.arena.max_frame_size() {
                        self.state = DecodeState::start();
                        return Err(FramingError::FrameTooLarge {
                            declared: required,
                            max: self.arena.max_frame_size(),
                        });
                    }

                    self.arena.begin(required);
                    self.state = DecodeState::Payload { required };
                }
                DecodeState::Payload { required } => {
                    while self.arena.len() < required && src.has_remaining() {
                        let chunk = src.chunk();
                        let n = chunk.len().min(required - self.arena.len());
                        self.arena.fill(&chunk[..n]);
                        src.advance(n);
                    }

                    if self.arena.len() < required {
                        return Ok(None);
                    }

                    self.arena.seal();
                    self.state = DecodeState::start();
                    self.frames_completed += 1;
                    return Ok(self.arena.checkout().map(Frame::new));
                }
            }
        }
    }

    /// Signal the end of the stream
    ///
    /// Fails if a partial frame was buffered; the partial bytes are dropped.
    pub fn finish(&mut self) -> Result<(), FramingError> {
        let state = std::mem::replace(&mut self.state, DecodeState::start());
        match state {
            DecodeState::Prefix { buffered: 0, .. } => Ok(()),
            DecodeState::Prefix { buffered, .. } => {
                Err(FramingError::TruncatedPrefix { received: buffered })
            }
            DecodeState::Payload { required } => {
                let received = self.arena.discard();
                Err(FramingError::TruncatedPayload {
                    received,
                    expected: required,
                })
            }
        }
    }

    /// Drop any partial frame, returning the number of bytes discarded
    pub fn reset(&mut self) -> usize {
        let state = std::mem::replace(&mut self.state, DecodeState::start());
        match state {
            DecodeState::Prefix { buffered, .. } => buffered,
            DecodeState::Payload { .. } => self.arena.discard(),
        }
    }
}

impl Drop for Reassembler {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let arena = std::mem::replace(&mut self.arena, FrameArena::new(0));
            pool.release(arena);
        }
    }
}
