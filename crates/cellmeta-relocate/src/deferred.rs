//! Write batches waiting for the host's next turn.
//!
//! A bulk push is reported before the host commits the move, so the
//! destinations' cell types are still stale when the notification arrives.
//! The write pass is therefore parked here and drained on the next turn.

use std::collections::VecDeque;

use cellmeta_store::{CellPos, Compound};

/// Snapshots collected by one push, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    entries: Vec<(CellPos, Compound)>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `snapshot` to be written at `destination`.
    pub fn push(&mut self, destination: CellPos, snapshot: Compound) {
        self.entries.push((destination, snapshot));
    }

    /// Number of recorded writes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destinations in recording order.
    pub fn destinations(&self) -> impl Iterator<Item = CellPos> + '_ {
        self.entries.iter().map(|(pos, _)| *pos)
    }

    /// Consumes the batch, yielding writes in write-pass order: last
    /// recorded (farthest from the pusher) first.
    pub fn into_write_order(self) -> impl Iterator<Item = (CellPos, Compound)> {
        self.entries.into_iter().rev()
    }
}

/// FIFO of batches scheduled for the next turn.
#[derive(Debug, Default)]
pub struct DeferredWrites {
    queue: VecDeque<WriteBatch>,
}

impl DeferredWrites {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `batch` for the next turn. Empty batches are dropped.
    pub fn schedule(&mut self, batch: WriteBatch) {
        if !batch.is_empty() {
            self.queue.push_back(batch);
        }
    }

    /// Takes the oldest scheduled batch.
    pub fn pop(&mut self) -> Option<WriteBatch> {
        self.queue.pop_front()
    }

    /// Number of scheduled batches.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total writes across all scheduled batches.
    pub fn pending_writes(&self) -> usize {
        self.queue.iter().map(WriteBatch::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
