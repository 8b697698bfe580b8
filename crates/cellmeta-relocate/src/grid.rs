//! What the coordinator needs to know about the host grid.

use cellmeta_store::{CellPos, CellTypeLookup};

/// Fate of one source cell during a bulk push.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveOutcome {
    /// The cell travels one step along the push direction.
    Moved,
    /// The cell is destroyed where it stands instead of moving.
    DestroyedInPlace,
}

/// Host grid as seen by the relocation coordinator.
///
/// [`move_outcome`](Grid::move_outcome) is only meaningful while a push
/// notification is being handled; hosts may answer anything otherwise.
pub trait Grid: CellTypeLookup {
    /// How the cell at `pos` reacts to the push being delivered.
    fn move_outcome(&self, pos: CellPos) -> MoveOutcome;
}
