//! Working buffer for frame reassembly
//!
//! Each reassembler works in one arena. The buffer cycles through three states:
//!
//! ```text
//!          fill()            seal()             checkout()
//!   ┌──► Filling ─────────► Ready ─────────────► Draining ──┐
//!   │                                                        │
//!   └──────────────────────── begin() ◄─────────────────────┘
//! ```
//!
//! `checkout()` splits the completed payload off as frozen `Bytes`. The
//! consumer owns that view and the arena keeps writing into the remainder of
//! the allocation, so producer and consumer never see the same bytes. When all
//! checked-out frames have been dropped, `begin()` reclaims the original
//! allocation instead of allocating a new one.
//!
//! An arena starts empty and only grows to the size of the frames it actually
//! carries; the frame size limit is a bound, not a preallocation. Arenas are
//! shared per session through an [`ArenaPool`], so a session that opens one
//! stream per frame keeps reusing the same few buffers.

use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};

/// Idle arenas kept by one pool
const MAX_IDLE_ARENAS: usize = 8;

/// State of the working buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Payload bytes are being copied in
    Filling,
    /// A complete frame sits in the buffer, not yet handed out
    Ready,
    /// The last frame was handed to the consumer
    Draining,
}

/// Reusable working buffer with explicit checkout
#[derive(Debug)]
pub struct FrameArena {
    buf: BytesMut,
    max_frame_size: usize,
    state: BufferState,
    checkouts: u64,
}

impl FrameArena {
    /// Create an empty arena for frames of up to `max_frame_size` bytes
    ///
    /// Nothing is allocated until the first [`begin`](Self::begin).
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_size,
            state: BufferState::Filling,
            checkouts: 0,
        }
    }

    /// Largest frame this arena accepts
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Bytes currently reserved by the working buffer
    pub fn allocated(&self) -> usize {
        self.buf.capacity()
    }

    /// Current buffer state
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Bytes buffered for the frame in progress
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of frames handed out so far
    pub fn checkouts(&self) -> u64 {
        self.checkouts
    }

    /// Prepare for a new frame of `required` bytes
    ///
    /// Reserves exactly `required`. Only allocates when the spare room left
    /// after earlier checkouts is too small and those frames are still alive.
    pub fn begin(&mut self, required: usize) {
        debug_assert!(required <= self.max_frame_size);
        self.buf.clear();
        self.buf.reserve(required);
        self.state = BufferState::Filling;
    }

    /// Append payload bytes to the frame in progress
    pub fn fill(&mut self, data: &[u8]) {
        debug_assert_eq!(self.state, BufferState::Filling);
        self.buf.extend_from_slice(data);
    }

    /// Mark the frame in progress as complete
    pub fn seal(&mut self) {
        self.state = BufferState::Ready;
    }

    /// Hand the completed frame to the consumer
    ///
    /// Returns `None` unless a sealed frame is waiting.
    pub fn checkout(&mut self) -> Option<Bytes> {
        if self.state != BufferState::Ready {
            return None;
        }

        self.state = BufferState::Draining;
        self.checkouts += 1;
        Some(self.buf.split().freeze())
    }

    /// Drop a partial frame, returning how many bytes were discarded
    pub fn discard(&mut self) -> usize {
        let discarded = self.buf.len();
        self.buf.clear();
        self.state = BufferState::Filling;
        discarded
    }
}

/// Arenas shared by the reassemblers of one session
///
/// Cloning shares the pool. Reassemblers acquire an arena when their stream
/// is accepted and release it when the stream ends.
#[derive(Debug, Clone)]
pub struct ArenaPool {
    max_frame_size: usize,
    idle: Arc<Mutex<Vec<FrameArena>>>,
}

impl ArenaPool {
    /// Create an empty pool handing out arenas for `max_frame_size` frames
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Take an idle arena, or create an empty one
    pub fn acquire(&self) -> FrameArena {
        let reused = match self.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(_) => None,
        };
        reused.unwrap_or_else(|| FrameArena::new(self.max_frame_size))
    }

    /// Return an arena for reuse
    ///
    /// Any partial frame is dropped. Arenas beyond the idle limit are freed.
    pub fn release(&self, mut arena: FrameArena) {
        arena.discard();
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE_ARENAS {
                idle.push(arena);
            }
        }
    }

    /// Number of arenas waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::DEFAULT_MAX_FRAME_SIZE;

    #[test]
    fn test_state_cycle() {
        let mut arena = FrameArena::new(64);
        assert_eq!(arena.state(), BufferState::Filling);

        arena.begin(3);
        arena.fill(&[1, 2, 3]);
        assert_eq!(arena.len(), 3);
        assert!(arena.checkout().is_none());

        arena.seal();
        assert_eq!(arena.state(), BufferState::Ready);

        let frame = arena.checkout().unwrap();
        assert_eq!(frame.as_ref(), &[1, 2, 3]);
        assert_eq!(arena.state(), BufferState::Draining);
        assert!(arena.is_empty());

        arena.begin(1);
        assert_eq!(arena.state(), BufferState::Filling);
        assert_eq!(arena.checkouts(), 1);
    }

    #[test]
    fn test_checked_out_frame_is_not_overwritten() {
        let mut arena = FrameArena::new(16);

        arena.begin(4);
        arena.fill(b"abcd");
        arena.seal();
        let first = arena.checkout().unwrap();

        arena.begin(4);
        arena.fill(b"wxyz");
        arena.seal();
        let second = arena.checkout().unwrap();

        assert_eq!(first.as_ref(), b"abcd");
        assert_eq!(second.as_ref(), b"wxyz");
    }

    #[test]
    fn test_discard() {
        let mut arena = FrameArena::new(16);
        arena.begin(8);
        arena.fill(&[0; 5]);

        assert_eq!(arena.discard(), 5);
        assert!(arena.is_empty());
        assert_eq!(arena.state(), BufferState::Filling);
    }

    #[test]
    fn test_small_frame_does_not_reserve_the_limit() {
        let mut arena = FrameArena::new(DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(arena.allocated(), 0);

        arena.begin(10);
        assert!(arena.allocated() >= 10);
        assert!(arena.allocated() < 1024);

        arena.fill(&[1; 10]);
        arena.seal();
        let frame = arena.checkout().unwrap();
        assert_eq!(frame.len(), 10);
    }

    #[test]
    fn test_allocation_reclaimed_after_frame_dropped() {
        let mut arena = FrameArena::new(DEFAULT_MAX_FRAME_SIZE);

        arena.begin(100);
        arena.fill(&[1; 100]);
        arena.seal();
        let first = arena.checkout().unwrap();
        let first_ptr = first.as_ptr();
        drop(first);

        arena.begin(100);
        arena.fill(&[2; 100]);
        arena.seal();
        let second = arena.checkout().unwrap();

        assert_eq!(second.as_ptr(), first_ptr);
        assert!(second.iter().all(|b| *b == 2));
    }

    #[test]
    fn test_pool_reuses_released_arenas() {
        let pool = ArenaPool::new(1024);
        let mut arena = pool.acquire();
        arena.begin(512);
        arena.fill(&[0; 100]);
        let allocated = arena.allocated();

        pool.release(arena);
        assert_eq!(pool.idle(), 1);

        let arena = pool.acquire();
        assert_eq!(pool.idle(), 0);
        assert!(arena.is_empty());
        assert_eq!(arena.allocated(), allocated);
        assert_eq!(arena.max_frame_size(), 1024);
    }

    #[test]
    fn test_pool_caps_idle_arenas() {
        let pool = ArenaPool::new(64);
        let arenas: Vec<_> = (0..MAX_IDLE_ARENAS + 3).map(|_| pool.acquire()).collect();
        for arena in arenas {
            pool.release(arena);
        }
        assert_eq!(pool.idle(), MAX_IDLE_ARENAS);
    }
}
