//! Bounded lock-free frame queue with a drop-oldest overflow policy.

use crossbeam::queue::ArrayQueue;

use crate::frame::FramePayload;

/// A bounded FIFO of frames awaiting playback.
///
/// Owned exclusively by one sink. All operations are lock-free and O(1), so
/// the producer's admission check never contends with the digest loop.
///
/// Insertion order is preserved; the only reordering event is the overflow
/// policy, which removes the head (oldest) entry to make room for a new one.
pub struct FrameQueue {
    inner: ArrayQueue<FramePayload>,
}

impl FrameQueue {
    /// Creates a queue holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Enqueues a frame.
    ///
    /// At capacity the oldest entry is displaced and returned; the new frame
    /// is always accepted. Recency is prioritized over completeness for live
    /// audio.
    pub fn push(&self, frame: FramePayload) -> Option<FramePayload> {
        self.inner.force_push(frame)
    }

    /// Removes and returns the oldest frame, if any.
    pub fn pop(&self) -> Option<FramePayload> {
        self.inner.pop()
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no frames are queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum number of frames the queue can hold.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Discards all queued frames.
    pub fn clear(&self) {
        while self.inner.pop().is_some() {}
    }
}
