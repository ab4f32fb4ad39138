//! Round-robin slot selection for multi-instance markers.
//!
//! The operator never picks which ear or food pellet to move. Each update of
//! a multi-instance kind takes the next slot in order, wrapping around the
//! slot count *at the time of the update*, so slots added or removed in the
//! meantime join or leave the rotation immediately.

use crate::marker::MarkerKind;

/// Next-slot counters for every multi-instance marker kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerCycler {
    next: [usize; MarkerKind::MULTI.len()],
}

impl MarkerCycler {
    /// Create a cycler with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(kind: MarkerKind) -> Option<usize> {
        MarkerKind::MULTI.iter().position(|k| *k == kind)
    }

    /// Slot due for the next update of `kind` without consuming it.
    pub fn peek(&self, kind: MarkerKind, slot_count: usize) -> Option<usize> {
        let i = Self::position(kind)?;
        if slot_count == 0 {
            return None;
        }
        Some(self.next[i] % slot_count)
    }

    /// Take the slot for an update of `kind` and advance the counter.
    ///
    /// Returns `None` for single-instance kinds or when there are no slots.
    pub fn next_slot(&mut self, kind: MarkerKind, slot_count: usize) -> Option<usize> {
        let slot = self.peek(kind, slot_count)?;
        let i = Self::position(kind)?;
        self.next[i] = slot + 1;
        Some(slot)
    }

    /// Reset every counter to zero. Called whenever the current frame changes.
    pub fn reset(&mut self) {
        self.next = Default::default();
    }
}
