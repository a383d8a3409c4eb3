//! Frame Queue
//!
//! FIFO hand-off between one background producer and the tick thread.
//! Producers only push; the tick thread only pops. The queue itself is
//! unbounded: each producer applies its own capacity policy, either by
//! waiting for room ([`FrameQueue::has_room`]) or by discarding the oldest
//! frames once over a ceiling ([`FrameQueue::push_with_ceiling`]).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::frame::Frame;

/// Shared FIFO of decoded frames
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    inner: Arc<Mutex<VecDeque<Frame>>>,
}

impl FrameQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame
    pub fn push(&self, frame: Frame) {
        self.inner.lock().push_back(frame);
    }

    /// Append a frame, then drop the oldest frames until at most `ceiling`
    /// remain
    ///
    /// Returns how many frames were discarded. A ceiling of zero disables
    /// trimming.
    pub fn push_with_ceiling(&self, frame: Frame, ceiling: usize) -> usize {
        let mut queue = self.inner.lock();
        queue.push_back(frame);
        let mut dropped = 0;
        if ceiling > 0 {
            while queue.len() > ceiling {
                queue.pop_front();
                dropped += 1;
            }
        }
        dropped
    }

    /// Take the oldest frame
    pub fn pop(&self) -> Option<Frame> {
        self.inner.lock().pop_front()
    }

    /// Frames currently queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Whether a producer bounded by `capacity` may push another frame
    #[must_use]
    pub fn has_room(&self, capacity: usize) -> bool {
        self.len() < capacity
    }

    /// Discard every queued frame
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
