//! In-memory identity map shared by both backends.
//!
//! # Responsibility
//! - Hold at most one live entity per (kind, id).
//! - Preserve insertion order for deterministic enumeration.
//!
//! # Invariants
//! - Registering an existing id overwrites the entry in place; the
//!   original insertion position is kept (last write wins).

use crate::model::{Entity, EntityId, EntityKind};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ObjectCache {
    slots: HashMap<EntityKind, KindSlot>,
}

#[derive(Debug, Default)]
struct KindSlot {
    by_id: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity under its (kind, id), last write wins.
    pub fn register(&mut self, entity: Entity) {
        let slot = self.slots.entry(entity.kind()).or_default();
        let id = entity.id();
        if slot.by_id.insert(id, entity).is_none() {
            slot.order.push(id);
        }
    }

    pub fn lookup(&self, kind: EntityKind, id: EntityId) -> Option<&Entity> {
        self.slots.get(&kind)?.by_id.get(&id)
    }

    /// Entities of one kind in insertion order.
    pub fn enumerate(&self, kind: EntityKind) -> Vec<&Entity> {
        let Some(slot) = self.slots.get(&kind) else {
            return Vec::new();
        };
        slot.order
            .iter()
            .filter_map(|id| slot.by_id.get(id))
            .collect()
    }

    /// Runs `apply` over every entity of one kind, in insertion order.
    pub fn for_each_mut(&mut self, kind: EntityKind, mut apply: impl FnMut(&mut Entity)) {
        let Some(slot) = self.slots.get_mut(&kind) else {
            return;
        };
        for id in &slot.order {
            if let Some(entity) = slot.by_id.get_mut(id) {
                apply(entity);
            }
        }
    }

    pub fn unregister(&mut self, kind: EntityKind, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(&kind)?;
        let removed = slot.by_id.remove(&id)?;
        slot.order.retain(|existing| *existing != id);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.slots.get(&kind).map_or(0, |slot| slot.by_id.len())
    }

    pub fn total(&self) -> usize {
        self.slots.values().map(|slot| slot.by_id.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
