//! Coordinate-indexed attribute storage.
//!
//! Cells have no storage slot of their own, so their attributes live in the
//! persistent container of the chunk that contains them:
//!
//! ```text
//! container
//! └── "blocks"            (present iff at least one cell has data)
//!     └── "x_y_z"         (present iff non-empty)
//!         ├── "custom"    (our data)
//!         └── ...         (other consumers, left untouched)
//! ```
//!
//! [`AttributeStore::open`] merges one cell's entry into a private
//! [`CellAttributeView`]; nothing is visible to other views until
//! [`CellAttributeView::save`].

use std::fmt;

use crate::backend::ContainerBackend;
use crate::cell_type::CellTypeId;
use crate::compound::{Compound, CompoundExt, Tag};
use crate::coords::{CellPos, ChunkAddress};
use crate::error::StoreError;

/// Reserved top-level key of the per-chunk attribute table.
pub const BLOCKS_KEY: &str = "blocks";

/// Reserved per-cell key isolating our data from other consumers.
pub const CUSTOM_KEY: &str = "custom";

/// Read access to the host grid's cell types.
pub trait CellTypeLookup {
    /// Current type of the cell at `pos`.
    fn cell_type(&self, pos: CellPos) -> CellTypeId;
}

impl<F: Fn(CellPos) -> CellTypeId> CellTypeLookup for F {
    fn cell_type(&self, pos: CellPos) -> CellTypeId {
        self(pos)
    }
}

fn malformed(chunk: ChunkAddress, key: &str) -> StoreError {
    StoreError::MalformedTable {
        chunk,
        key: key.to_string(),
    }
}

/// Chunk-scoped mapping from [`CellPos`] to attribute compounds.
pub struct AttributeStore<B> {
    backend: B,
}

impl<B: ContainerBackend> AttributeStore<B> {
    /// Creates a store on top of `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the underlying backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consumes the store, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Returns `true` iff opening `pos` would yield a non-empty view.
    ///
    /// Probes the table directly: no view is built, nothing is merged and no
    /// container is created.
    pub fn exists<G>(&self, grid: &G, pos: CellPos) -> Result<bool, StoreError>
    where
        G: CellTypeLookup + ?Sized,
    {
        if grid.cell_type(pos).is_empty() {
            return Ok(false);
        }
        let entry = self.stored_entry(pos.chunk(), &pos.tag())?;
        Ok(entry.is_some_and(|c| !c.is_empty()))
    }

    /// Opens a working view of the attributes at `pos`.
    ///
    /// A cell whose type is empty cannot hold attributes: any entry left
    /// behind for it is deleted here and the view starts empty.
    pub fn open<'a, G>(
        &'a mut self,
        grid: &'a G,
        pos: CellPos,
    ) -> Result<CellAttributeView<'a, B, G>, StoreError>
    where
        G: CellTypeLookup + ?Sized,
    {
        let chunk = pos.chunk();
        let tag = pos.tag();
        let mut compound = Compound::new();

        if grid.cell_type(pos).is_empty() {
            if self.remove_entry(chunk, &tag)? {
                tracing::warn!(%pos, "discarded stale attributes of empty cell");
            }
        } else if let Some(stored) = self.stored_entry(chunk, &tag)? {
            compound.merge(stored);
        }

        Ok(CellAttributeView {
            store: self,
            grid,
            pos,
            compound,
        })
    }

    /// Drops the custom data at `pos` and saves, leaving other consumers'
    /// keys in place.
    pub fn remove<G>(&mut self, grid: &G, pos: CellPos) -> Result<(), StoreError>
    where
        G: CellTypeLookup + ?Sized,
    {
        let mut view = self.open(grid, pos)?;
        view.clear_custom();
        view.save()
    }

    /// Number of cells in `chunk` with a stored entry.
    pub fn chunk_entries(&self, chunk: ChunkAddress) -> Result<usize, StoreError> {
        let Some(container) = self.backend.container(chunk)? else {
            return Ok(0);
        };
        match container.get_tag(BLOCKS_KEY) {
            None => Ok(0),
            Some(Tag::Compound(blocks)) => Ok(blocks.len()),
            Some(_) => Err(malformed(chunk, BLOCKS_KEY)),
        }
    }

    fn stored_entry(&self, chunk: ChunkAddress, tag: &str) -> Result<Option<&Compound>, StoreError> {
        let Some(container) = self.backend.container(chunk)? else {
            return Ok(None);
        };
        match container.get_tag(BLOCKS_KEY) {
            None => Ok(None),
            Some(Tag::Compound(blocks)) => match blocks.get_tag(tag) {
                None => Ok(None),
                Some(Tag::Compound(entry)) => Ok(Some(entry)),
                Some(_) => Err(malformed(chunk, tag)),
            },
            Some(_) => Err(malformed(chunk, BLOCKS_KEY)),
        }
    }

    /// Removes the entry for `tag`, dropping the table key once it is empty.
    ///
    /// Returns `true` if an entry was removed. Never creates a container.
    fn remove_entry(&mut self, chunk: ChunkAddress, tag: &str) -> Result<bool, StoreError> {
        let needs_write = match self.backend.container(chunk)? {
            None => false,
            Some(container) => match container.get_tag(BLOCKS_KEY) {
                None => false,
                Some(Tag::Compound(blocks)) => blocks.contains_key(tag) || blocks.is_empty(),
                Some(_) => return Err(malformed(chunk, BLOCKS_KEY)),
            },
        };
        if !needs_write {
            return Ok(false);
        }

        let container = self.backend.container_mut(chunk)?;
        let Some(blocks) = container.get_compound_mut(BLOCKS_KEY) else {
            return Ok(false);
        };
        let removed = blocks.take(tag).is_some();
        if blocks.is_empty() {
            container.take(BLOCKS_KEY);
        }
        Ok(removed)
    }

    fn write_entry(
        &mut self,
        chunk: ChunkAddress,
        tag: String,
        entry: Compound,
    ) -> Result<(), StoreError> {
        let container = self.backend.container_mut(chunk)?;
        if container
            .get_tag(BLOCKS_KEY)
            .is_some_and(|t| !matches!(t, Tag::Compound(_)))
        {
            return Err(malformed(chunk, BLOCKS_KEY));
        }
        container
            .get_or_create_compound(BLOCKS_KEY)
            .insert(tag, entry);
        Ok(())
    }
}

/// Private working copy of one cell's attributes.
///
/// Obtained from [`AttributeStore::open`]; changes are committed only by
/// [`save`](CellAttributeView::save).
pub struct CellAttributeView<'a, B, G: ?Sized> {
    store: &'a mut AttributeStore<B>,
    grid: &'a G,
    pos: CellPos,
    compound: Compound,
}

impl<B, G> CellAttributeView<'_, B, G>
where
    B: ContainerBackend,
    G: CellTypeLookup + ?Sized,
{
    /// Position this view belongs to.
    pub fn pos(&self) -> CellPos {
        self.pos
    }

    /// The whole working compound, including other consumers' keys.
    pub fn compound(&self) -> &Compound {
        &self.compound
    }

    /// Returns `true` if the view holds nothing.
    pub fn is_empty(&self) -> bool {
        self.compound.is_empty()
    }

    /// The custom sub-compound, if present.
    pub fn custom(&self) -> Option<&Compound> {
        self.compound.get_compound(CUSTOM_KEY)
    }

    /// The custom sub-compound, created if absent.
    pub fn custom_data(&mut self) -> &mut Compound {
        self.compound.get_or_create_compound(CUSTOM_KEY)
    }

    /// Replaces the custom sub-compound wholesale.
    ///
    /// An empty `custom` is the same as [`clear_custom`](Self::clear_custom).
    pub fn set_custom(&mut self, custom: Compound) {
        if custom.is_empty() {
            self.clear_custom();
        } else {
            self.compound.insert(CUSTOM_KEY, custom);
        }
    }

    /// Removes only the custom sub-compound.
    pub fn clear_custom(&mut self) {
        self.compound.take(CUSTOM_KEY);
    }

    /// Independent copy of the whole working compound.
    pub fn deep_copy(&self) -> Compound {
        self.compound.clone()
    }

    /// The working compound plus the cell's type and coordinates, for
    /// diagnostics. The view's `Display` prints it as SNBT.
    pub fn describe(&self) -> Compound {
        let mut out = self.compound.clone();
        out.insert("id", i32::from(self.grid.cell_type(self.pos).0));
        out.insert("x", self.pos.x);
        out.insert("y", self.pos.y);
        out.insert("z", self.pos.z);
        out
    }

    /// Commits the view to the chunk's table.
    ///
    /// An empty-type cell always ends up with no entry. An empty custom
    /// sub-compound is not persisted, and an empty view removes the entry
    /// (and the table key once the chunk has no entries left).
    pub fn save(mut self) -> Result<(), StoreError> {
        if self.grid.cell_type(self.pos).is_empty() {
            self.compound.clear();
        }
        if self
            .compound
            .get_compound(CUSTOM_KEY)
            .is_some_and(Compound::is_empty)
        {
            self.compound.take(CUSTOM_KEY);
        }

        let chunk = self.pos.chunk();
        if self.compound.is_empty() {
            self.store.remove_entry(chunk, &self.pos.tag())?;
        } else {
            tracing::trace!(pos = %self.pos, "saving attributes");
            self.store.write_entry(chunk, self.pos.tag(), self.compound)?;
        }
        Ok(())
    }
}

impl<B, G> fmt::Display for CellAttributeView<'_, B, G>
where
    B: ContainerBackend,
    G: CellTypeLookup + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe().to_snbt())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
