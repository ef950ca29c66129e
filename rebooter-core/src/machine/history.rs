//! Fixed-size log of recent state transitions.

use heapless::{HistoryBuf, OldestOrdered};

use super::Transition;

/// Number of transitions retained.
pub const HISTORY_CAPACITY: usize = 16;

/// A transition stamped with the instant it was applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransitionRecord<I> {
    pub transition: Transition,
    pub at: I,
}

/// Ring buffer that keeps the most recent [`HISTORY_CAPACITY`] transitions.
#[derive(Debug)]
pub struct TransitionLog<I>
where
    I: Copy,
{
    ring: HistoryBuf<TransitionRecord<I>, HISTORY_CAPACITY>,
    total: u32,
}

impl<I> TransitionLog<I>
where
    I: Copy,
{
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            total: 0,
        }
    }

    pub fn record(&mut self, transition: Transition, at: I) {
        self.ring.write(TransitionRecord { transition, at });
        self.total = self.total.saturating_add(1);
    }

    /// Retained records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TransitionRecord<I>> {
        self.ring.oldest_ordered()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&TransitionRecord<I>> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Transitions recorded since start-up, including evicted ones.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }
}

impl<I> Default for TransitionLog<I>
where
    I: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}
