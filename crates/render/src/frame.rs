use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};

/// Frames the CPU may record ahead of GPU completion.
pub const FRAMES_IN_FLIGHT: usize = 3;

/// Byte stride between per-frame uniform slots. Matches the common
/// `min_uniform_buffer_offset_alignment`.
pub const UNIFORM_SLOT_STRIDE: u64 = 256;

/// How long frame acquisition blocks before proceeding anyway.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of waiting for a frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Acquired,
    /// No slot freed up within the timeout. The caller proceeds without one.
    TimedOut,
}

/// Counting semaphore bounding frames in flight.
///
/// Holds one token per free frame in a bounded channel. Acquiring takes a
/// token; GPU completion puts one back through a [`FrameCompletion`]. A
/// completion arriving while the channel is full is dropped, so free tokens
/// never exceed capacity. The in-flight bound is soft: after a timed-out
/// acquire the frame proceeds without a token, so up to capacity + 1 frames
/// can be outstanding until the surplus completion is dropped.
#[derive(Debug)]
pub struct FrameThrottle {
    tokens: Sender<()>,
    free: Receiver<()>,
    capacity: usize,
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::new(FRAMES_IN_FLIGHT)
    }
}

impl FrameThrottle {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tokens, free) = bounded(capacity);
        for _ in 0..capacity {
            // Cannot fail: the channel was sized for exactly this many.
            let _ = tokens.try_send(());
        }
        Self {
            tokens,
            free,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames acquired and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Take a slot if one is free, without blocking.
    pub fn try_acquire(&self) -> bool {
        self.free.try_recv().is_ok()
    }

    /// Block until a slot is free or `timeout` elapses.
    pub fn acquire(&self, timeout: Duration) -> Acquire {
        match self.free.recv_timeout(timeout) {
            Ok(()) => Acquire::Acquired,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    in_flight = self.in_flight(),
                    "frame acquire timed out, proceeding"
                );
                Acquire::TimedOut
            }
            // `self.tokens` keeps the channel connected.
            Err(RecvTimeoutError::Disconnected) => Acquire::TimedOut,
        }
    }

    /// Handle that releases one slot when signalled. Safe to move into a GPU
    /// completion callback running on another thread.
    pub fn completion(&self) -> FrameCompletion {
        FrameCompletion {
            tokens: self.tokens.clone(),
        }
    }
}

/// Releases one frame slot back to its [`FrameThrottle`].
#[derive(Debug, Clone)]
pub struct FrameCompletion {
    tokens: Sender<()>,
}

impl FrameCompletion {
    pub fn signal(self) {
        if let Err(TrySendError::Full(())) = self.tokens.try_send(()) {
            tracing::trace!("frame completion with no outstanding slot");
        }
    }
}

/// Ring of per-frame uniform slots in one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRing {
    slot: usize,
    slots: usize,
    stride: u64,
}

impl Default for FrameRing {
    fn default() -> Self {
        Self::new(FRAMES_IN_FLIGHT, UNIFORM_SLOT_STRIDE)
    }
}

impl FrameRing {
    pub fn new(slots: usize, stride: u64) -> Self {
        Self {
            slot: 0,
            slots: slots.max(1),
            stride,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Byte offset of `slot` in the ring buffer.
    pub fn offset_of(&self, slot: usize) -> u64 {
        (slot % self.slots) as u64 * self.stride
    }

    /// Byte offset of the current slot.
    pub fn offset(&self) -> u64 {
        self.offset_of(self.slot)
    }

    /// Total buffer size backing the ring.
    pub fn buffer_size(&self) -> u64 {
        self.slots as u64 * self.stride
    }

    /// Move to the next slot, returning it.
    pub fn advance(&mut self) -> usize {
        self.slot = (self.slot + 1) % self.slots;
        self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn throttle_starts_with_all_slots_free() {
        let throttle = FrameThrottle::default();
        assert_eq!(throttle.capacity(), 3);
        assert_eq!(throttle.in_flight(), 0);
    }

    #[test]
    fn fourth_acquire_blocks_until_timeout() {
        let throttle = FrameThrottle::new(3);
        for _ in 0..3 {
            assert_eq!(throttle.acquire(Duration::from_millis(10)), Acquire::Acquired);
        }
        assert_eq!(throttle.in_flight(), 3);
        assert!(!throttle.try_acquire());

        let start = Instant::now();
        assert_eq!(throttle.acquire(Duration::from_millis(20)), Acquire::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn completion_frees_a_slot() {
        let throttle = FrameThrottle::new(2);
        assert!(throttle.try_acquire());
        assert!(throttle.try_acquire());
        throttle.completion().signal();
        assert_eq!(throttle.in_flight(), 1);
        assert!(throttle.try_acquire());
    }

    #[test]
    fn excess_completions_do_not_overfill() {
        let throttle = FrameThrottle::new(3);
        for _ in 0..5 {
            throttle.completion().signal();
        }
        assert_eq!(throttle.in_flight(), 0);
        for _ in 0..3 {
            assert!(throttle.try_acquire());
        }
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn completion_from_another_thread_unblocks_acquire() {
        let throttle = FrameThrottle::new(1);
        assert!(throttle.try_acquire());

        let completion = throttle.completion();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completion.signal();
        });

        assert_eq!(throttle.acquire(Duration::from_secs(5)), Acquire::Acquired);
        worker.join().unwrap();
    }

    #[test]
    fn in_flight_never_exceeds_capacity() {
        let throttle = FrameThrottle::new(3);
        let mut pending = Vec::new();
        for frame in 0..30 {
            if throttle.try_acquire() {
                pending.push(throttle.completion());
            }
            assert!(throttle.in_flight() <= 3);
            if frame % 2 == 1 {
                if let Some(done) = pending.pop() {
                    done.signal();
                }
            }
        }

        for done in pending.drain(..) {
            done.signal();
        }
        assert_eq!(throttle.in_flight(), 0);
        assert!(throttle.try_acquire());
    }

    #[test]
    fn ring_offsets_wrap() {
        let mut ring = FrameRing::default();
        assert_eq!(ring.buffer_size(), 768);
        let offsets: Vec<u64> = (0..5)
            .map(|_| {
                let offset = ring.offset();
                ring.advance();
                offset
            })
            .collect();
        assert_eq!(offsets, vec![0, 256, 512, 0, 256]);
        assert_eq!(ring.slot(), 2);
        assert_eq!(ring.offset_of(4), 256);
    }
}
