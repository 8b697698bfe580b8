//! Structured attribute values.
//!
//! Attributes are plain NBT: [`Compound`] and [`Tag`] are the `quartz_nbt`
//! compound and tag types, so a chunk container can be written with the
//! same reader/writer a host uses for the rest of its chunk data. The
//! `preserve_order` feature keeps keys in insertion order, which makes the
//! encoded bytes of a container deterministic.
//!
//! [`CompoundExt`] adds the lookups the store needs on top of the
//! `quartz_nbt` API: untyped access by key, nested-compound helpers and a
//! deep merge.

pub use quartz_nbt::{NbtCompound as Compound, NbtList, NbtTag as Tag};

/// Key-based helpers over [`Compound`].
pub trait CompoundExt {
    /// Returns the raw tag stored under `key`.
    fn get_tag(&self, key: &str) -> Option<&Tag>;

    /// Mutable variant of [`get_tag`](CompoundExt::get_tag).
    fn get_tag_mut(&mut self, key: &str) -> Option<&mut Tag>;

    /// Removes and returns the tag under `key`, keeping the order of the
    /// remaining keys.
    fn take(&mut self, key: &str) -> Option<Tag>;

    /// Removes every entry.
    fn clear(&mut self);

    /// Returns the nested compound under `key`, if present and a compound.
    fn get_compound(&self, key: &str) -> Option<&Compound> {
        match self.get_tag(key) {
            Some(Tag::Compound(c)) => Some(c),
            _ => None,
        }
    }

    /// Mutable variant of [`get_compound`](CompoundExt::get_compound).
    fn get_compound_mut(&mut self, key: &str) -> Option<&mut Compound> {
        match self.get_tag_mut(key) {
            Some(Tag::Compound(c)) => Some(c),
            _ => None,
        }
    }

    /// Returns the nested compound under `key`, creating it if absent.
    ///
    /// A non-compound value already stored under `key` is replaced.
    fn get_or_create_compound(&mut self, key: &str) -> &mut Compound;

    /// Returns the `Int` stored under `key`.
    fn get_int(&self, key: &str) -> Option<i32> {
        match self.get_tag(key) {
            Some(Tag::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string stored under `key`.
    fn get_str(&self, key: &str) -> Option<&str> {
        match self.get_tag(key) {
            Some(Tag::String(v)) => Some(v),
            _ => None,
        }
    }

    /// Deep-merges `other` into `self`.
    ///
    /// Nested compounds present on both sides are merged recursively; every
    /// other value from `other` overwrites the one in `self`.
    fn merge(&mut self, other: &Compound);
}

impl CompoundExt for Compound {
    fn get_tag(&self, key: &str) -> Option<&Tag> {
        self.inner().get(key)
    }

    fn get_tag_mut(&mut self, key: &str) -> Option<&mut Tag> {
        self.inner_mut().get_mut(key)
    }

    fn take(&mut self, key: &str) -> Option<Tag> {
        self.inner_mut().shift_remove(key)
    }

    fn clear(&mut self) {
        self.inner_mut().clear();
    }

    fn get_or_create_compound(&mut self, key: &str) -> &mut Compound {
        let slot = self
            .inner_mut()
            .entry(key.to_string())
            .or_insert_with(|| Tag::Compound(Compound::new()));
        if !matches!(slot, Tag::Compound(_)) {
            *slot = Tag::Compound(Compound::new());
        }
        match slot {
            Tag::Compound(compound) => compound,
            _ => unreachable!("slot holds a compound"),
        }
    }

    fn merge(&mut self, other: &Compound) {
        for (key, tag) in other.inner() {
            match (self.get_tag_mut(key), tag) {
                (Some(Tag::Compound(mine)), Tag::Compound(theirs)) => mine.merge(theirs),
                _ => {
                    self.insert(key.clone(), tag.clone());
                }
            }
        }
    }
}

/// Builds a compound from `(key, value)` pairs, in order.
pub fn compound_of<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Compound
where
    K: Into<String>,
    V: Into<Tag>,
{
    let mut out = Compound::new();
    for (key, value) in pairs {
        out.insert(key, value);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_compound_creates_once() {
        let mut root = Compound::new();
        root.get_or_create_compound("custom").insert("a", 1);
        root.get_or_create_compound("custom").insert("b", 2);

        let custom = root.get_compound("custom").expect("created");
        assert_eq!(custom.get_int("a"), Some(1));
        assert_eq!(custom.get_int("b"), Some(2));
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_get_or_create_compound_replaces_scalar() {
        let mut root = Compound::new();
        root.insert("custom", 5);
        assert!(root.get_or_create_compound("custom").is_empty());
        assert!(root.get_compound("custom").is_some());
    }

    #[test]
    fn test_merge_is_deep() {
        let mut base = compound_of([("keep", 1)]);
        base.get_or_create_compound("nested").insert("x", 1);
        base.get_or_create_compound("nested").insert("y", 1);

        let mut incoming = Compound::new();
        incoming.get_or_create_compound("nested").insert("y", 2);
        incoming.insert("new", "hello");

        base.merge(&incoming);

        let nested = base.get_compound("nested").unwrap();
        assert_eq!(nested.get_int("x"), Some(1));
        assert_eq!(nested.get_int("y"), Some(2));
        assert_eq!(base.get_int("keep"), Some(1));
        assert_eq!(base.get_str("new"), Some("hello"));
    }

    #[test]
    fn test_merge_scalar_overwrites_compound() {
        let mut base = Compound::new();
        base.get_or_create_compound("k").insert("x", 1);
        base.merge(&compound_of([("k", 7)]));
        assert_eq!(base.get_int("k"), Some(7));
    }

    #[test]
    fn test_take_keeps_remaining_order() {
        let mut c = compound_of([("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(c.take("a"), Some(Tag::Int(1)));
        assert_eq!(c.take("a"), None);
        let keys: Vec<&str> = c.inner().keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "c"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = Compound::new();
        original.get_or_create_compound("custom").insert("a", 1);
        let copy = original.clone();
        original.get_or_create_compound("custom").insert("a", 99);
        assert_eq!(copy.get_compound("custom").unwrap().get_int("a"), Some(1));
    }

    #[test]
    fn test_typed_getters_reject_wrong_kind() {
        let mut c = Compound::new();
        c.insert("n", 3i64);
        c.insert("s", "text");
        assert_eq!(c.get_int("n"), None);
        assert_eq!(c.get_tag("n"), Some(&Tag::Long(3)));
        assert_eq!(c.get_str("s"), Some("text"));
        assert_eq!(c.get_str("missing"), None);
    }
}
