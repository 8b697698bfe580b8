//! Simulated host: a sparse voxel world with pushers, explosions and chunk
//! persistence, driving a [`RelocationCoordinator`] one turn per event.

use std::collections::BTreeMap;

use cellmeta_config::{RelocationConfig, WritePlacement};
use cellmeta_relocate::{
    EventOutcome, Grid, GridEvent, GridEventKind, MoveOutcome, PushEvent, PushKind,
    RelocationCoordinator,
};
use cellmeta_store::{
    AttributeStore, BLOCKS_KEY, CUSTOM_KEY, CellPos, CellTypeId, CellTypeLookup,
    CellTypeRegistry, ChunkAddress, Compound, CompoundExt, ContainerBackend, Direction,
    MemoryBackend, RegistryError, StoreError, Tag,
};
use serde_json::{Map, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Longest run a single pusher can move.
pub(crate) const PUSH_LIMIT: usize = 12;

#[derive(Debug, Error)]
pub(crate) enum DemoError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Cell types the simulated world knows about.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Palette {
    pub stone: CellTypeId,
    pub glass: CellTypeId,
    pub sand: CellTypeId,
}

/// Sparse grid of non-empty cells.
pub(crate) struct SimWorld {
    registry: CellTypeRegistry,
    palette: Palette,
    cells: FxHashMap<CellPos, CellTypeId>,
    fragile: FxHashSet<CellTypeId>,
    /// Source types shown while an already-committed push is delivered.
    pre_move: FxHashMap<CellPos, CellTypeId>,
}

impl SimWorld {
    pub(crate) fn new() -> Result<Self, DemoError> {
        let mut registry = CellTypeRegistry::new();
        let palette = Palette {
            stone: registry.register("stone")?,
            glass: registry.register("glass")?,
            sand: registry.register("sand")?,
        };
        let mut fragile = FxHashSet::default();
        fragile.insert(palette.glass);
        Ok(Self {
            registry,
            palette,
            cells: FxHashMap::default(),
            fragile,
            pre_move: FxHashMap::default(),
        })
    }

    pub(crate) fn palette(&self) -> Palette {
        self.palette
    }

    pub(crate) fn type_name(&self, id: CellTypeId) -> &str {
        self.registry.name(id).unwrap_or("unknown")
    }

    pub(crate) fn set(&mut self, pos: CellPos, ty: CellTypeId) {
        if ty.is_empty() {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, ty);
        }
    }

    pub(crate) fn is_solid(&self, pos: CellPos) -> bool {
        self.cells.contains_key(&pos)
    }

    pub(crate) fn is_fragile(&self, pos: CellPos) -> bool {
        self.fragile.contains(&self.cell_type(pos))
    }

    /// Non-empty cells in coordinate order.
    pub(crate) fn solid_cells(&self) -> Vec<CellPos> {
        let mut cells: Vec<_> = self.cells.keys().copied().collect();
        cells.sort();
        cells
    }

    /// Cells a pusher at `pusher` facing `direction` would move, nearest
    /// first. `None` if there is nothing to push or the run is too long.
    pub(crate) fn extend_run(&self, pusher: CellPos, direction: Direction) -> Option<Vec<CellPos>> {
        let mut run = Vec::new();
        let mut next = pusher.step(direction);
        while !self.cell_type(next).is_empty() {
            if run.len() == PUSH_LIMIT {
                return None;
            }
            run.push(next);
            next = next.step(direction);
        }
        (!run.is_empty()).then_some(run)
    }

    /// Moves non-fragile sources one step along the push and destroys the
    /// fragile ones.
    fn commit(&mut self, push: &PushEvent) {
        let moved: Vec<_> = push
            .sources
            .iter()
            .filter(|s| self.move_outcome(**s) == MoveOutcome::Moved)
            .filter_map(|s| Some((push.destination(*s)?, self.cell_type(*s))))
            .collect();
        for s in &push.sources {
            self.cells.remove(s);
        }
        for (dest, ty) in moved {
            self.set(dest, ty);
        }
    }

    fn apply(&mut self, event: &GridEvent) {
        match &event.kind {
            GridEventKind::Broken { pos } | GridEventKind::Burned { pos } => {
                self.cells.remove(pos);
            }
            GridEventKind::Replaced { pos, new_type } => self.set(*pos, *new_type),
            GridEventKind::Exploded { cells } => {
                for pos in cells {
                    self.cells.remove(pos);
                }
            }
            GridEventKind::Pushed(push) => self.commit(push),
        }
    }
}

impl CellTypeLookup for SimWorld {
    fn cell_type(&self, pos: CellPos) -> CellTypeId {
        if let Some(ty) = self.pre_move.get(&pos) {
            return *ty;
        }
        self.cells.get(&pos).copied().unwrap_or(CellTypeId::EMPTY)
    }
}

impl Grid for SimWorld {
    fn move_outcome(&self, pos: CellPos) -> MoveOutcome {
        if self.is_fragile(pos) {
            MoveOutcome::DestroyedInPlace
        } else {
            MoveOutcome::Moved
        }
    }
}

/// The world plus the attribute machinery, advanced one event per turn.
pub(crate) struct Host {
    pub(crate) world: SimWorld,
    coordinator: RelocationCoordinator<MemoryBackend>,
    turn: u64,
}

impl Host {
    pub(crate) fn new(world: SimWorld, config: &RelocationConfig) -> Self {
        let store = AttributeStore::new(MemoryBackend::new());
        Self {
            world,
            coordinator: RelocationCoordinator::with_config(store, config),
            turn: 0,
        }
    }

    pub(crate) fn turn(&self) -> u64 {
        self.turn
    }

    pub(crate) fn backend(&self) -> &MemoryBackend {
        self.coordinator.store().backend()
    }

    pub(crate) fn backend_mut(&mut self) -> &mut MemoryBackend {
        self.coordinator.store_mut().backend_mut()
    }

    /// Starts a new turn, flushing writes deferred by the previous one.
    pub(crate) fn begin_turn(&mut self) -> Result<usize, StoreError> {
        self.turn += 1;
        self.coordinator.run_deferred(&self.world)
    }

    /// Sets `custom.<key> = value` on the cell at `pos`.
    pub(crate) fn tag(&mut self, pos: CellPos, key: &str, value: i32) -> Result<(), StoreError> {
        let mut view = self.coordinator.store_mut().open(&self.world, pos)?;
        view.custom_data().insert(key, value);
        view.save()
    }

    /// Reads `custom.<key>` at `pos`.
    pub(crate) fn attribute(&mut self, pos: CellPos, key: &str) -> Result<Option<i32>, StoreError> {
        let view = self.coordinator.store_mut().open(&self.world, pos)?;
        Ok(view.custom().and_then(|custom| custom.get_int(key)))
    }

    /// Diagnostic rendering of the cell at `pos`.
    pub(crate) fn describe(&mut self, pos: CellPos) -> Result<String, StoreError> {
        let view = self.coordinator.store_mut().open(&self.world, pos)?;
        Ok(view.to_string())
    }

    /// Fires a pusher at `pusher` facing `direction`.
    ///
    /// Returns `None` if the pusher is blocked or has nothing to move.
    pub(crate) fn extend(
        &mut self,
        pusher: CellPos,
        direction: Direction,
    ) -> Result<Option<EventOutcome>, StoreError> {
        let Some(sources) = self.world.extend_run(pusher, direction) else {
            return Ok(None);
        };
        let event = GridEvent::pushed(sources, direction, PushKind::Extend);
        self.deliver(event).map(Some)
    }

    /// Retracts a sticky pusher at `pusher` facing `direction`, pulling the
    /// cell two steps away into the gap in front of it.
    pub(crate) fn retract(
        &mut self,
        pusher: CellPos,
        direction: Direction,
    ) -> Result<Option<EventOutcome>, StoreError> {
        let gap = pusher.step(direction);
        let pulled = gap.step(direction);
        if !self.world.cell_type(gap).is_empty()
            || self.world.cell_type(pulled).is_empty()
            || self.world.is_fragile(pulled)
        {
            return Ok(None);
        }
        let event = GridEvent::pushed(vec![pulled], direction.opposite(), PushKind::Retract);
        self.deliver(event).map(Some)
    }

    pub(crate) fn break_cell(&mut self, pos: CellPos) -> Result<EventOutcome, StoreError> {
        self.deliver(GridEvent::broken(pos))
    }

    pub(crate) fn burn(&mut self, pos: CellPos) -> Result<EventOutcome, StoreError> {
        self.deliver(GridEvent::burned(pos))
    }

    pub(crate) fn replace(&mut self, pos: CellPos, new_type: CellTypeId) -> Result<EventOutcome, StoreError> {
        self.deliver(GridEvent::replaced(pos, new_type))
    }

    /// Destroys every non-empty cell within `radius` (Chebyshev) of `center`.
    pub(crate) fn explode(&mut self, center: CellPos, radius: i32) -> Result<EventOutcome, StoreError> {
        let mut cells = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let pos = center.offset(dx, dy, dz);
                    if !self.world.cell_type(pos).is_empty() {
                        cells.push(pos);
                    }
                }
            }
        }
        self.deliver(GridEvent::exploded(cells))
    }

    /// Runs one turn: flush last turn's writes, notify, then commit.
    ///
    /// Cancelled events are delivered but never committed.
    pub(crate) fn deliver(&mut self, event: GridEvent) -> Result<EventOutcome, StoreError> {
        let flushed = self.begin_turn()?;
        if flushed > 0 {
            debug!(turn = self.turn, flushed, "flushed deferred writes");
        }

        if event.cancelled {
            return self.coordinator.handle(&self.world, &event);
        }

        match (&event.kind, self.coordinator.placement()) {
            (GridEventKind::Pushed(push), WritePlacement::Immediate) => {
                // Commit first and expose pre-move source types meanwhile, so
                // destinations already read as their post-move types.
                let before: FxHashMap<_, _> = push
                    .sources
                    .iter()
                    .map(|s| (*s, self.world.cell_type(*s)))
                    .collect();
                self.world.commit(push);
                self.world.pre_move = before;
                let outcome = self.coordinator.handle(&self.world, &event);
                self.world.pre_move.clear();
                outcome
            }
            _ => {
                let outcome = self.coordinator.handle(&self.world, &event)?;
                self.world.apply(&event);
                Ok(outcome)
            }
        }
    }

    /// Every stored per-cell entry, keyed by position.
    pub(crate) fn entries(&self) -> Result<BTreeMap<CellPos, Compound>, StoreError> {
        let mut out = BTreeMap::new();
        for (chunk, container) in self.backend().iter() {
            let Some(tag) = container.get_tag(BLOCKS_KEY) else {
                continue;
            };
            let Tag::Compound(blocks) = tag else {
                return Err(StoreError::MalformedTable {
                    chunk: *chunk,
                    key: BLOCKS_KEY.to_string(),
                });
            };
            for (key, entry) in blocks.inner().iter() {
                match (CellPos::from_tag(key), entry) {
                    (Some(pos), Tag::Compound(entry)) => {
                        out.insert(pos, entry.clone());
                    }
                    _ => {
                        return Err(StoreError::MalformedTable {
                            chunk: *chunk,
                            key: key.to_string(),
                        });
                    }
                }
            }
        }
        Ok(out)
    }

    /// Checks the store against the world: no entry on an empty cell, no
    /// attribute id on two cells.
    pub(crate) fn check_invariants(&self) -> Result<usize, DemoError> {
        let entries = self.entries()?;
        let mut seen = FxHashMap::default();
        for (pos, entry) in &entries {
            if self.world.cell_type(*pos).is_empty() {
                return Err(DemoError::Invariant(format!("entry left on empty cell {pos}")));
            }
            if let Some(id) = entry.get_compound(CUSTOM_KEY).and_then(|c| c.get_int("id"))
                && let Some(other) = seen.insert(id, *pos)
            {
                return Err(DemoError::Invariant(format!(
                    "id {id} duplicated at {other} and {pos}"
                )));
            }
        }
        Ok(entries.len())
    }

    /// Positions currently holding each attribute id.
    pub(crate) fn id_positions(&self) -> Result<BTreeMap<i32, CellPos>, StoreError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter_map(|(pos, entry)| {
                entry
                    .get_compound(CUSTOM_KEY)
                    .and_then(|c| c.get_int("id"))
                    .map(|id| (id, pos))
            })
            .collect())
    }

    /// Saves every chunk to bytes, unloads it and loads it back.
    pub(crate) fn reload_chunks(&mut self) -> Result<usize, StoreError> {
        let chunks: Vec<ChunkAddress> = self.backend().iter().map(|(chunk, _)| *chunk).collect();
        let mut bytes_total = 0;
        for chunk in &chunks {
            let Some(bytes) = self.backend().export_chunk(*chunk)? else {
                continue;
            };
            bytes_total += bytes.len();
            self.backend_mut().unload_chunk(*chunk);
            self.backend_mut().import_chunk(*chunk, &bytes)?;
        }
        info!(chunks = chunks.len(), bytes = bytes_total, "reloaded chunk containers");
        Ok(bytes_total)
    }

    /// Attribute tables of every chunk as pretty JSON, keyed by chunk.
    pub(crate) fn tables_json(&self) -> Result<String, DemoError> {
        let mut tables = BTreeMap::new();
        for (chunk, container) in self.backend().iter() {
            if let Some(blocks) = container.get_compound(BLOCKS_KEY) {
                tables.insert(chunk.to_string(), compound_json(blocks));
            }
        }
        Ok(serde_json::to_string_pretty(&tables)?)
    }

    /// Number of chunks whose container still has an attribute table.
    pub(crate) fn chunks_with_tables(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        for (chunk, _) in self.backend().iter() {
            if self.backend().container(*chunk)?.is_some_and(|c| c.contains_key(BLOCKS_KEY)) {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn compound_json(compound: &Compound) -> Value {
    let fields: Map<String, Value> = compound
        .inner().iter()
        .map(|(key, tag)| (key.to_string(), tag_json(tag)))
        .collect();
    Value::Object(fields)
}

fn tag_json(tag: &Tag) -> Value {
    match tag {
        Tag::Byte(v) => Value::from(*v),
        Tag::Short(v) => Value::from(*v),
        Tag::Int(v) => Value::from(*v),
        Tag::Long(v) => Value::from(*v),
        Tag::Float(v) => Value::from(*v),
        Tag::Double(v) => Value::from(*v),
        Tag::String(v) => Value::from(v.as_str()),
        Tag::ByteArray(v) => v.iter().copied().collect(),
        Tag::IntArray(v) => v.iter().copied().collect(),
        Tag::LongArray(v) => v.iter().copied().collect(),
        Tag::List(items) => items.iter().map(tag_json).collect(),
        Tag::Compound(c) => compound_json(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32, z: i32) -> CellPos {
        CellPos::new(x, y, z)
    }

    fn host(write_placement: WritePlacement) -> Host {
        let config = RelocationConfig { write_placement };
        Host::new(SimWorld::new().unwrap(), &config)
    }

    fn line(host: &mut Host, len: i32) {
        let stone = host.world.palette().stone;
        for x in 0..len {
            host.world.set(p(x, 0, 0), stone);
            host.tag(p(x, 0, 0), "id", x + 1).unwrap();
        }
    }

    #[test]
    fn test_extend_run_stops_at_gap() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 3);
        let run = h.world.extend_run(p(-1, 0, 0), Direction::PosX).unwrap();
        assert_eq!(run, vec![p(0, 0, 0), p(1, 0, 0), p(2, 0, 0)]);
        assert!(h.world.extend_run(p(-1, 5, 0), Direction::PosX).is_none());
    }

    #[test]
    fn test_extend_run_respects_limit() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, PUSH_LIMIT as i32 + 1);
        assert!(h.world.extend_run(p(-1, 0, 0), Direction::PosX).is_none());
    }

    #[test]
    fn test_deferred_push_lands_next_turn() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 3);
        h.extend(p(-1, 0, 0), Direction::PosX).unwrap();

        // Written only once the next turn starts.
        assert_eq!(h.attribute(p(3, 0, 0), "id").unwrap(), None);
        h.begin_turn().unwrap();
        assert_eq!(h.attribute(p(1, 0, 0), "id").unwrap(), Some(1));
        assert_eq!(h.attribute(p(3, 0, 0), "id").unwrap(), Some(3));
        assert_eq!(h.check_invariants().unwrap(), 3);
    }

    #[test]
    fn test_immediate_push_lands_same_turn() {
        let mut h = host(WritePlacement::Immediate);
        line(&mut h, 3);
        h.extend(p(-1, 0, 0), Direction::PosX).unwrap();
        assert_eq!(h.attribute(p(0, 0, 0), "id").unwrap(), None);
        assert_eq!(h.attribute(p(3, 0, 0), "id").unwrap(), Some(3));
        assert_eq!(h.check_invariants().unwrap(), 3);
    }

    #[test]
    fn test_glass_is_destroyed_in_place() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 3);
        let glass = h.world.palette().glass;
        h.world.set(p(1, 0, 0), glass);

        h.extend(p(-1, 0, 0), Direction::PosX).unwrap();
        h.begin_turn().unwrap();
        let ids = h.id_positions().unwrap();
        assert_eq!(ids.get(&1), Some(&p(1, 0, 0)));
        assert_eq!(ids.get(&2), None);
        assert_eq!(ids.get(&3), Some(&p(3, 0, 0)));
    }

    #[test]
    fn test_retract_pulls_one_cell() {
        let mut h = host(WritePlacement::Deferred);
        let stone = h.world.palette().stone;
        h.world.set(p(0, 2, 0), stone);
        h.tag(p(0, 2, 0), "id", 9).unwrap();

        h.retract(p(0, 0, 0), Direction::PosY).unwrap().unwrap();
        h.begin_turn().unwrap();
        assert_eq!(h.attribute(p(0, 1, 0), "id").unwrap(), Some(9));
        assert_eq!(h.attribute(p(0, 2, 0), "id").unwrap(), None);
    }

    #[test]
    fn test_replace_with_sand_clears() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 1);
        let sand = h.world.palette().sand;
        h.replace(p(0, 0, 0), sand).unwrap();
        assert_eq!(h.attribute(p(0, 0, 0), "id").unwrap(), None);
        assert_eq!(h.world.type_name(h.world.cell_type(p(0, 0, 0))), "sand");
    }

    #[test]
    fn test_cancelled_break_is_not_committed() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 1);
        let outcome = h.deliver(GridEvent::broken(p(0, 0, 0)).cancel()).unwrap();
        assert_eq!(outcome, EventOutcome::Cancelled);
        assert_eq!(h.attribute(p(0, 0, 0), "id").unwrap(), Some(1));
    }

    #[test]
    fn test_reload_keeps_tables() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 20);
        let before = h.entries().unwrap();
        assert!(h.reload_chunks().unwrap() > 0);
        assert_eq!(h.entries().unwrap(), before);
    }

    #[test]
    fn test_tables_json_lists_chunks() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 1);
        let json: serde_json::Value = serde_json::from_str(&h.tables_json().unwrap()).unwrap();
        assert!(json["[0, 0, 0]"]["0_0_0"].is_object());
        assert_eq!(json["[0, 0, 0]"]["0_0_0"]["custom"]["id"], 1);
    }

    #[test]
    fn test_explosion_empties_chunk_table() {
        let mut h = host(WritePlacement::Deferred);
        line(&mut h, 3);
        h.explode(p(1, 0, 0), 1).unwrap();
        assert_eq!(h.chunks_with_tables().unwrap(), 0);
        assert_eq!(h.check_invariants().unwrap(), 0);
    }
}
