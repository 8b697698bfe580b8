//! Access to each chunk's persistent container.
//!
//! The host owns chunk persistence; the store only needs to read and edit
//! the [`Compound`] a chunk carries. [`MemoryBackend`] keeps every container
//! in memory, keyed by [`ChunkAddress`], and can export/import containers as
//! uncompressed NBT to stand in for a host's chunk save/load cycle.

use std::io::Cursor;

use quartz_nbt::io::{Flavor, read_nbt, write_nbt};
use rustc_hash::FxHashMap;

use crate::compound::Compound;
use crate::coords::ChunkAddress;
use crate::error::StoreError;

/// Host-provided access to per-chunk persistent containers.
///
/// Implementations report failures as [`StoreError::Backend`]; the store
/// never retries or swallows them.
pub trait ContainerBackend {
    /// Read-only access to the container of `chunk`.
    ///
    /// `Ok(None)` means the chunk has no container yet, which is
    /// indistinguishable from an empty one.
    fn container(&self, chunk: ChunkAddress) -> Result<Option<&Compound>, StoreError>;

    /// Mutable access to the container of `chunk`, creating it if needed.
    fn container_mut(&mut self, chunk: ChunkAddress) -> Result<&mut Compound, StoreError>;
}

/// In-memory container storage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    containers: FxHashMap<ChunkAddress, Compound>,
}

impl MemoryBackend {
    /// Creates a backend with no containers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks that currently have a container.
    pub fn loaded_count(&self) -> usize {
        self.containers.len()
    }

    /// Iterates over all `(address, container)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkAddress, &Compound)> {
        self.containers.iter()
    }

    /// Removes and returns the container of `chunk`.
    pub fn unload_chunk(&mut self, chunk: ChunkAddress) -> Option<Compound> {
        self.containers.remove(&chunk)
    }

    /// Encodes the container of `chunk` as an unnamed, uncompressed NBT
    /// root compound.
    ///
    /// Returns `Ok(None)` if the chunk has no container.
    pub fn export_chunk(&self, chunk: ChunkAddress) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(container) = self.containers.get(&chunk) else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        write_nbt(&mut bytes, None, container, Flavor::Uncompressed)
            .map_err(|source| StoreError::Nbt { chunk, source })?;
        Ok(Some(bytes))
    }

    /// Replaces the container of `chunk` with one decoded from NBT bytes.
    ///
    /// On error the previous container, if any, is left untouched.
    pub fn import_chunk(&mut self, chunk: ChunkAddress, bytes: &[u8]) -> Result<(), StoreError> {
        let (container, _root_name) = read_nbt(&mut Cursor::new(bytes), Flavor::Uncompressed)
            .map_err(|source| StoreError::Nbt { chunk, source })?;
        self.containers.insert(chunk, container);
        Ok(())
    }
}

impl ContainerBackend for MemoryBackend {
    fn container(&self, chunk: ChunkAddress) -> Result<Option<&Compound>, StoreError> {
        Ok(self.containers.get(&chunk))
    }

    fn container_mut(&mut self, chunk: ChunkAddress) -> Result<&mut Compound, StoreError> {
        Ok(self.containers.entry(chunk).or_insert_with(Compound::new))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compound::CompoundExt;

    #[test]
    fn test_missing_container_reads_none() {
        let backend = MemoryBackend::new();
        assert!(backend.container(ChunkAddress::new(0, 0, 0)).unwrap().is_none());
        assert_eq!(backend.loaded_count(), 0);
    }

    #[test]
    fn test_container_mut_creates_once() {
        let mut backend = MemoryBackend::new();
        let a = ChunkAddress::new(1, 2, 3);
        backend.container_mut(a).unwrap().insert("k", 1);
        backend.container_mut(a).unwrap().insert("j", 2);
        assert_eq!(backend.loaded_count(), 1);
        assert_eq!(backend.container(a).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut backend = MemoryBackend::new();
        let a = ChunkAddress::new(-1, 0, 4);
        backend
            .container_mut(a)
            .unwrap()
            .get_or_create_compound("blocks")
            .insert("x", "y");

        let bytes = backend.export_chunk(a).unwrap().expect("container exists");
        let original = backend.unload_chunk(a).unwrap();
        assert!(backend.container(a).unwrap().is_none());

        backend.import_chunk(a, &bytes).unwrap();
        assert_eq!(backend.container(a).unwrap(), Some(&original));
        assert_eq!(backend.export_chunk(a).unwrap(), Some(bytes));
    }

    #[test]
    fn test_export_missing_chunk_is_none() {
        let backend = MemoryBackend::new();
        assert!(backend.export_chunk(ChunkAddress::new(9, 9, 9)).unwrap().is_none());
    }

    #[test]
    fn test_import_corrupt_bytes_is_nbt_error() {
        let mut backend = MemoryBackend::new();
        let result = backend.import_chunk(ChunkAddress::new(0, 0, 0), b"nope");
        assert!(matches!(result, Err(StoreError::Nbt { .. })));
        assert_eq!(backend.loaded_count(), 0);
    }

    #[test]
    fn test_import_truncated_keeps_previous_container() {
        let mut backend = MemoryBackend::new();
        let a = ChunkAddress::new(0, 0, 0);
        backend
            .container_mut(a)
            .unwrap()
            .get_or_create_compound("blocks")
            .get_or_create_compound("0_0_0")
            .insert("custom", "payload");
        let bytes = backend.export_chunk(a).unwrap().unwrap();

        let result = backend.import_chunk(a, &bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(StoreError::Nbt { .. })));
        let blocks = backend.container(a).unwrap().unwrap().get_compound("blocks");
        assert!(blocks.is_some_and(|b| b.contains_key("0_0_0")));
    }

    #[test]
    fn test_exported_bytes_are_plain_nbt() {
        let mut backend = MemoryBackend::new();
        let a = ChunkAddress::new(2, 0, 0);
        backend.container_mut(a).unwrap().insert("k", 7);
        let bytes = backend.export_chunk(a).unwrap().unwrap();

        let (decoded, root_name) =
            read_nbt(&mut Cursor::new(bytes.as_slice()), Flavor::Uncompressed).unwrap();
        assert!(root_name.is_empty());
        assert_eq!(decoded.get::<_, i32>("k").unwrap(), 7);
    }
}
