//! Global tick counter
//!
//! One counter per engine, shared by the scheduler (the only writer) and
//! anything that needs to know the current tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared, monotonically increasing tick counter
///
/// Cloning yields another handle to the same counter.
#[derive(Debug, Clone, Default)]
pub struct TickClock {
    tick: Arc<AtomicU64>,
}

impl TickClock {
    /// Counter starting at tick 0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick
    #[must_use]
    pub fn now(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Advance by one tick, returning the new value
    pub fn advance(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::AcqRel) + 1
    }
}
