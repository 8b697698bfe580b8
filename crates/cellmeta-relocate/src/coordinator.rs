//! Keeps attributes attached to cells as the grid mutates.
//!
//! Destructive events drop the custom data of every affected cell. A bulk
//! push runs three passes, each to completion before the next starts:
//!
//! 1. **snapshot**: copy the attributes of every source that moves and
//!    has data, keyed by its destination;
//! 2. **clear**: drop the custom data of every source, moved or not;
//! 3. **write**: replace the custom data at each destination with its
//!    snapshot, farthest destination first.
//!
//! A destination is usually another source of the same push, so clearing
//! must finish before any write. The write pass runs inline or on the next
//! turn depending on [`WritePlacement`].
//!
//! Delivering the same push again while its write batch is still queued is
//! harmless: the sources are already clear, so the replay carries nothing.
//! Once the write pass has run, the destinations that are also sources hold
//! data again and a replay moves it one more step. Hosts deliver each
//! committed push exactly once.

use cellmeta_config::{RelocationConfig, WritePlacement};
use cellmeta_store::{AttributeStore, CUSTOM_KEY, CompoundExt, ContainerBackend, StoreError, Tag};
use tracing::{debug, trace};

use crate::deferred::{DeferredWrites, WriteBatch};
use crate::events::{GridEvent, GridEventKind, PushEvent};
use crate::grid::{Grid, MoveOutcome};

/// Result of handling one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was cancelled; nothing was touched.
    Cancelled,
    /// The event did not affect attributes (e.g. replaced with the same type).
    Unchanged,
    /// Custom data was dropped at `cells` coordinates.
    Cleared {
        /// Number of coordinates processed.
        cells: usize,
    },
    /// A push was processed.
    Relocated {
        /// Number of sources whose attributes travel to a destination.
        carried: usize,
        /// `true` if the write pass was queued for the next turn.
        deferred: bool,
    },
}

/// Drives attribute cleanup and relocation in response to [`GridEvent`]s.
pub struct RelocationCoordinator<B> {
    store: AttributeStore<B>,
    placement: WritePlacement,
    deferred: DeferredWrites,
}

impl<B: ContainerBackend> RelocationCoordinator<B> {
    /// Creates a coordinator that owns `store`.
    pub fn new(store: AttributeStore<B>, placement: WritePlacement) -> Self {
        Self {
            store,
            placement,
            deferred: DeferredWrites::new(),
        }
    }

    /// Creates a coordinator configured from `config`.
    pub fn with_config(store: AttributeStore<B>, config: &RelocationConfig) -> Self {
        Self::new(store, config.write_placement)
    }

    /// The attribute store.
    pub fn store(&self) -> &AttributeStore<B> {
        &self.store
    }

    /// Mutable access to the attribute store.
    pub fn store_mut(&mut self) -> &mut AttributeStore<B> {
        &mut self.store
    }

    /// Consumes the coordinator, returning the store.
    ///
    /// Writes still queued for the next turn are discarded.
    pub fn into_store(self) -> AttributeStore<B> {
        self.store
    }

    /// Placement of the write pass.
    pub fn placement(&self) -> WritePlacement {
        self.placement
    }

    /// Write batches waiting for [`run_deferred`](Self::run_deferred).
    pub fn pending_batches(&self) -> usize {
        self.deferred.len()
    }

    /// Handles one grid event.
    ///
    /// Backing-store failures abort the event immediately and are returned
    /// as-is; passes already completed are not rolled back.
    pub fn handle<G>(&mut self, grid: &G, event: &GridEvent) -> Result<EventOutcome, StoreError>
    where
        G: Grid + ?Sized,
    {
        if event.cancelled {
            trace!(kind = ?event.kind, "ignoring cancelled event");
            return Ok(EventOutcome::Cancelled);
        }

        match &event.kind {
            GridEventKind::Broken { pos } | GridEventKind::Burned { pos } => {
                self.store.remove(grid, *pos)?;
                Ok(EventOutcome::Cleared { cells: 1 })
            }
            GridEventKind::Replaced { pos, new_type } => {
                if grid.cell_type(*pos) == *new_type {
                    return Ok(EventOutcome::Unchanged);
                }
                self.store.remove(grid, *pos)?;
                Ok(EventOutcome::Cleared { cells: 1 })
            }
            GridEventKind::Exploded { cells } => {
                for pos in cells {
                    self.store.remove(grid, *pos)?;
                }
                debug!(cells = cells.len(), "cleared exploded cells");
                Ok(EventOutcome::Cleared { cells: cells.len() })
            }
            GridEventKind::Pushed(push) => self.relocate(grid, push),
        }
    }

    /// Runs every write pass queued by earlier pushes.
    ///
    /// Hosts call this once at the start of each turn. Returns the number of
    /// destinations written. On failure the failing batch is abandoned and
    /// later batches stay queued.
    pub fn run_deferred<G>(&mut self, grid: &G) -> Result<usize, StoreError>
    where
        G: Grid + ?Sized,
    {
        let mut written = 0;
        while let Some(batch) = self.deferred.pop() {
            written += self.write_pass(grid, batch)?;
        }
        if written > 0 {
            debug!(written, "ran deferred relocation writes");
        }
        Ok(written)
    }

    fn relocate<G>(&mut self, grid: &G, push: &PushEvent) -> Result<EventOutcome, StoreError>
    where
        G: Grid + ?Sized,
    {
        let mut batch = WriteBatch::new();

        for &source in &push.sources {
            if grid.move_outcome(source) == MoveOutcome::DestroyedInPlace {
                trace!(%source, "destroyed in place, attributes dropped");
                continue;
            }
            let Some(destination) = push.destination(source) else {
                trace!(%source, "no destination inside the coordinate range, attributes dropped");
                continue;
            };
            if !self.store.exists(grid, source)? {
                continue;
            }
            let snapshot = self.store.open(grid, source)?.deep_copy();
            batch.push(destination, snapshot);
        }

        for &source in &push.sources {
            self.store.remove(grid, source)?;
        }

        let carried = batch.len();
        debug!(
            sources = push.sources.len(),
            carried,
            direction = ?push.direction,
            kind = ?push.kind,
            "snapshot and clear complete"
        );

        match self.placement {
            WritePlacement::Immediate => {
                self.write_pass(grid, batch)?;
                Ok(EventOutcome::Relocated {
                    carried,
                    deferred: false,
                })
            }
            WritePlacement::Deferred => {
                self.deferred.schedule(batch);
                Ok(EventOutcome::Relocated {
                    carried,
                    deferred: carried > 0,
                })
            }
        }
    }

    fn write_pass<G>(&mut self, grid: &G, batch: WriteBatch) -> Result<usize, StoreError>
    where
        G: Grid + ?Sized,
    {
        let mut written = 0;
        for (destination, mut snapshot) in batch.into_write_order() {
            let mut view = self.store.open(grid, destination)?;
            match snapshot.take(CUSTOM_KEY) {
                Some(Tag::Compound(custom)) => view.set_custom(custom),
                _ => view.clear_custom(),
            }
            view.save()?;
            trace!(%destination, "wrote relocated attributes");
            written += 1;
        }
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
