//! Coordinate-indexed custom attributes for cells of a voxel grid.
//!
//! Cells have no storage of their own; their attributes are kept in the
//! persistent container of the chunk that contains them, under a reserved
//! table keyed by `"x_y_z"`. See [`AttributeStore`] for the access rules.

pub mod backend;
pub mod cell_type;
pub mod compound;
pub mod coords;
pub mod error;
pub mod store;

pub use backend::{ContainerBackend, MemoryBackend};
pub use cell_type::{CellTypeId, CellTypeRegistry, RegistryError};
pub use compound::{Compound, CompoundExt, NbtList, Tag, compound_of};
pub use coords::{CHUNK_SIZE, CellPos, ChunkAddress, Direction};
pub use error::StoreError;
pub use store::{AttributeStore, BLOCKS_KEY, CUSTOM_KEY, CellAttributeView, CellTypeLookup};
