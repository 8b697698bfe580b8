//! Grid mutation events the coordinator reacts to.
//!
//! Every event carries a `cancelled` flag. Hosts deliver events before they
//! apply the change, so a later listener may still veto it; a cancelled
//! event must leave attributes untouched.

use cellmeta_store::{CellPos, CellTypeId, Direction};

/// Whether a pusher is extending (pushing) or retracting (pulling).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PushKind {
    /// Cells are pushed away from the pusher.
    Extend,
    /// Cells are pulled back toward the pusher.
    Retract,
}

/// A contiguous run of cells moving one step along `direction`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushEvent {
    /// Source cells in the order the host reports them, conventionally
    /// nearest to the pusher first.
    pub sources: Vec<CellPos>,
    /// Direction every moved cell travels.
    pub direction: Direction,
    /// Extend or retract.
    pub kind: PushKind,
}

impl PushEvent {
    /// Destination of `source` if it moves, or `None` when the step would
    /// leave the coordinate range.
    pub fn destination(&self, source: CellPos) -> Option<CellPos> {
        source.checked_step(self.direction)
    }
}

/// What happened to the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridEventKind {
    /// A cell was broken.
    Broken {
        /// The broken cell.
        pos: CellPos,
    },
    /// A cell burned away.
    Burned {
        /// The burned cell.
        pos: CellPos,
    },
    /// Something is about to change the type of a cell.
    Replaced {
        /// The affected cell.
        pos: CellPos,
        /// The type the cell is changing to.
        new_type: CellTypeId,
    },
    /// An explosion destroyed a set of cells.
    Exploded {
        /// Every destroyed cell, in no particular order.
        cells: Vec<CellPos>,
    },
    /// A pusher moved a run of cells.
    Pushed(PushEvent),
}

/// A grid event plus its cancellation state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridEvent {
    /// What happened.
    pub kind: GridEventKind,
    /// Set when another listener vetoed the change.
    pub cancelled: bool,
}

impl GridEvent {
    /// Wraps `kind` as a live (not cancelled) event.
    pub fn new(kind: GridEventKind) -> Self {
        Self {
            kind,
            cancelled: false,
        }
    }

    /// A cell was broken.
    pub fn broken(pos: CellPos) -> Self {
        Self::new(GridEventKind::Broken { pos })
    }

    /// A cell burned away.
    pub fn burned(pos: CellPos) -> Self {
        Self::new(GridEventKind::Burned { pos })
    }

    /// A cell is changing to `new_type`.
    pub fn replaced(pos: CellPos, new_type: CellTypeId) -> Self {
        Self::new(GridEventKind::Replaced { pos, new_type })
    }

    /// An explosion destroyed `cells`.
    pub fn exploded(cells: Vec<CellPos>) -> Self {
        Self::new(GridEventKind::Exploded { cells })
    }

    /// A pusher moved `sources` one step along `direction`.
    pub fn pushed(sources: Vec<CellPos>, direction: Direction, kind: PushKind) -> Self {
        Self::new(GridEventKind::Pushed(PushEvent {
            sources,
            direction,
            kind,
        }))
    }

    /// Marks the event as cancelled.
    pub fn cancel(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
