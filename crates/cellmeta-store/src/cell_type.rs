//! Cell type identifiers and a small name registry.
//!
//! The store only ever asks one question of a cell type: is it empty?
//! Empty is always ID 0 so that zero-initialized grid memory reads as void.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compact identifier of a cell's type as reported by the host grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellTypeId(pub u16);

impl CellTypeId {
    /// The empty (air-equivalent) cell type. Such cells never hold attributes.
    pub const EMPTY: CellTypeId = CellTypeId(0);

    /// Returns `true` if this is the empty type.
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

/// Errors that can occur during cell type registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with the same name has already been registered.
    #[error("duplicate cell type name: {0}")]
    DuplicateName(String),
    /// All 65 535 user-defined slots have been consumed.
    #[error("cell type registry is full (max 65536 types)")]
    RegistryFull,
}

/// Maps [`CellTypeId`] ↔ human-readable names.
///
/// Hosts that already own a type table do not need this; it exists for
/// diagnostics and for the simulated host.
pub struct CellTypeRegistry {
    /// Dense array where `index == CellTypeId.0`.
    names: Vec<String>,
    name_to_id: HashMap<String, CellTypeId>,
}

impl CellTypeRegistry {
    /// Creates a registry with `"air"` pre-registered as [`CellTypeId::EMPTY`].
    pub fn new() -> Self {
        let mut name_to_id = HashMap::new();
        name_to_id.insert("air".to_string(), CellTypeId::EMPTY);
        Self {
            names: vec!["air".to_string()],
            name_to_id,
        }
    }

    /// Registers a new type name and returns its ID.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is taken,
    /// [`RegistryError::RegistryFull`] once all IDs are used.
    pub fn register(&mut self, name: &str) -> Result<CellTypeId, RegistryError> {
        if self.name_to_id.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        if self.names.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = CellTypeId(self.names.len() as u16);
        self.name_to_id.insert(name.to_string(), id);
        self.names.push(name.to_string());
        Ok(id)
    }

    /// Returns the name for `id`, or `None` for unknown IDs.
    pub fn name(&self, id: CellTypeId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Returns the ID registered under `name`.
    pub fn lookup_by_name(&self, name: &str) -> Option<CellTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Number of registered types, including air.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }
}

impl Default for CellTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_is_empty_id() {
        let registry = CellTypeRegistry::new();
        assert_eq!(registry.lookup_by_name("air"), Some(CellTypeId::EMPTY));
        assert!(CellTypeId::EMPTY.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut registry = CellTypeRegistry::new();
        assert_eq!(registry.register("stone").unwrap(), CellTypeId(1));
        assert_eq!(registry.register("sand").unwrap(), CellTypeId(2));
        assert_eq!(registry.name(CellTypeId(2)), Some("sand"));
        assert_eq!(registry.len(), 3);
        assert!(!CellTypeId(1).is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = CellTypeRegistry::new();
        registry.register("stone").unwrap();
        assert!(matches!(
            registry.register("stone"),
            Err(RegistryError::DuplicateName(_))
        ));
        assert!(matches!(
            registry.register("air"),
            Err(RegistryError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_unknown_id_has_no_name() {
        let registry = CellTypeRegistry::new();
        assert_eq!(registry.name(CellTypeId(40)), None);
    }
}
