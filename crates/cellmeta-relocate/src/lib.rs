//! Keeps cell attributes attached to their cells while the grid mutates.
//!
//! The host delivers [`GridEvent`]s to a [`RelocationCoordinator`] before it
//! applies each change. Breaks, burns, explosions and type replacements drop
//! the affected cells' custom data; bulk pushes carry it along to the
//! destination cells. With [`WritePlacement::Deferred`] the host must call
//! [`RelocationCoordinator::run_deferred`] at the start of its next turn.

pub mod coordinator;
pub mod deferred;
pub mod events;
pub mod grid;

pub use cellmeta_config::WritePlacement;
pub use coordinator::{EventOutcome, RelocationCoordinator};
pub use deferred::{DeferredWrites, WriteBatch};
pub use events::{GridEvent, GridEventKind, PushEvent, PushKind};
pub use grid::{Grid, MoveOutcome};
