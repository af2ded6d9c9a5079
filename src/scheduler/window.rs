//! Bounded dispatch window
//!
//! At most `limit` items are in flight; each release frees one slot which the
//! caller refills from the pending queue, lowest index first.

use std::collections::VecDeque;

#[derive(Debug)]
pub(crate) struct SlidingWindow {
    pending: VecDeque<usize>,
    in_flight: usize,
    limit: usize,
}

impl SlidingWindow {
    /// Window over indices `0..count` with `limit` slots (at least one).
    pub(crate) fn new(count: usize, limit: usize) -> Self {
        Self {
            pending: (0..count).collect(),
            in_flight: 0,
            limit: limit.max(1),
        }
    }

    /// Claim a slot for the next pending index, if a slot is free.
    pub(crate) fn next_dispatch(&mut self) -> Option<usize> {
        if self.in_flight >= self.limit {
            return None;
        }
        let index = self.pending.pop_front()?;
        self.in_flight += 1;
        Some(index)
    }

    /// Free the slot of an item whose fetch ended.
    pub(crate) fn release(&mut self) {
        debug_assert!(self.in_flight > 0, "release without dispatch");
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }
}
