//! Attribute store error types.

use quartz_nbt::io::NbtIoError;

use crate::coords::ChunkAddress;

/// Errors surfaced by the attribute store.
///
/// Absence of data is never an error; every variant here means the chunk's
/// persistent container could not be read or written as expected.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store rejected a read or write.
    #[error("backing store failed for chunk {chunk}: {reason}")]
    Backend {
        /// Chunk whose container was being accessed.
        chunk: ChunkAddress,
        /// Backend-supplied description.
        reason: String,
    },

    /// The container holds something other than a compound where a
    /// compound is required.
    #[error("malformed attribute table in chunk {chunk}: key {key:?} is not a compound")]
    MalformedTable {
        /// Chunk whose container is malformed.
        chunk: ChunkAddress,
        /// Offending key.
        key: String,
    },

    /// A container could not be written to or read from NBT bytes.
    #[error("NBT i/o failed for chunk {chunk}: {source}")]
    Nbt {
        /// Chunk being exported or imported.
        chunk: ChunkAddress,
        /// Reader/writer error.
        #[source]
        source: NbtIoError,
    },
}
