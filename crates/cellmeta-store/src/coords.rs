//! Cell and chunk addressing.
//!
//! A cell is identified purely by its [`CellPos`]. Cells are grouped into
//! cubic chunks of [`CHUNK_SIZE`]³ cells, addressed by [`ChunkAddress`]; each
//! chunk owns one persistent container holding the attributes of its cells.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Edge length of a cubic chunk, in cells.
pub const CHUNK_SIZE: i32 = 16;

/// World-space position of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    /// World X coordinate.
    pub x: i32,
    /// World Y coordinate.
    pub y: i32,
    /// World Z coordinate.
    pub z: i32,
}

impl CellPos {
    /// Creates a new cell position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the position offset by `(dx, dy, dz)`, or `None` if any
    /// coordinate leaves the `i32` range.
    pub fn checked_offset(self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            z: self.z.checked_add(dz)?,
        })
    }

    /// Returns the position offset by `(dx, dy, dz)`.
    ///
    /// Coordinates saturate at the `i32` bounds; use
    /// [`checked_offset`](Self::checked_offset) to detect the edge.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// Returns the neighbouring position one step along `dir`, or `None`
    /// past the edge of the coordinate range.
    pub fn checked_step(self, dir: Direction) -> Option<Self> {
        let (dx, dy, dz) = dir.offset();
        self.checked_offset(dx, dy, dz)
    }

    /// Returns the neighbouring position one step along `dir`, saturating
    /// like [`offset`](Self::offset).
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.offset();
        self.offset(dx, dy, dz)
    }

    /// Returns the address of the chunk containing this cell.
    ///
    /// Uses floored division so negative coordinates map to the chunk
    /// below zero rather than chunk 0.
    pub fn chunk(self) -> ChunkAddress {
        ChunkAddress {
            x: self.x.div_euclid(CHUNK_SIZE),
            y: self.y.div_euclid(CHUNK_SIZE),
            z: self.z.div_euclid(CHUNK_SIZE),
        }
    }

    /// Key of this cell inside its chunk's attribute table (`"x_y_z"`).
    pub fn tag(self) -> String {
        format!("{}_{}_{}", self.x, self.y, self.z)
    }

    /// Parses a `"x_y_z"` table key back into a position.
    ///
    /// Returns `None` for anything that is not exactly three integers.
    pub fn from_tag(tag: &str) -> Option<Self> {
        // Negative coordinates contain '-', never '_', so splitting is unambiguous.
        let mut parts = tag.split('_');
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { x, y, z })
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Identifies a chunk's position in the chunk grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkAddress {
    /// Chunk-grid X coordinate.
    pub x: i32,
    /// Chunk-grid Y coordinate.
    pub y: i32,
    /// Chunk-grid Z coordinate.
    pub z: i32,
}

impl ChunkAddress {
    /// Creates a new chunk address.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns `true` if `pos` lies inside this chunk.
    pub fn contains(self, pos: CellPos) -> bool {
        pos.chunk() == self
    }

    /// Position of the chunk's minimum-corner cell.
    pub fn origin(self) -> CellPos {
        CellPos::new(
            self.x * CHUNK_SIZE,
            self.y * CHUNK_SIZE,
            self.z * CHUNK_SIZE,
        )
    }
}

impl fmt::Display for ChunkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// One of the six axis-aligned unit directions a push can travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// +X direction.
    PosX,
    /// −X direction.
    NegX,
    /// +Y direction.
    PosY,
    /// −Y direction.
    NegY,
    /// +Z direction.
    PosZ,
    /// −Z direction.
    NegZ,
}

impl Direction {
    /// All six directions in order.
    pub const ALL: [Direction; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// Unit offset `(dx, dy, dz)` of this direction.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::PosX => (1, 0, 0),
            Self::NegX => (-1, 0, 0),
            Self::PosY => (0, 1, 0),
            Self::NegY => (0, -1, 0),
            Self::PosZ => (0, 0, 1),
            Self::NegZ => (0, 0, -1),
        }
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            Self::PosX => Self::NegX,
            Self::NegX => Self::PosX,
            Self::PosY => Self::NegY,
            Self::NegY => Self::PosY,
            Self::PosZ => Self::NegZ,
            Self::NegZ => Self::PosZ,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
