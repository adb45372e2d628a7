//! Entity identifiers and the authoritative entity table.
//!
//! An [`Entity`] is a lightweight `u64` identifier with no inherent data. Ids
//! come from an [`IdPool`], so an id is unique among live entities but may be
//! reused once a deleted entity has been fully released.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ComponentError;
use crate::id_pool::IdPool;
use crate::mask::BitMask;

/// A unique entity identifier.
///
/// Entities are pure identifiers. Components are attached to entities to give
/// them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Per-entity bookkeeping held by the [`EntityTable`].
#[derive(Debug, Clone)]
pub struct EntityRecord {
    entity: Entity,
    components: BitMask,
    systems: BitMask,
    enabled: bool,
    visible: bool,
    sequence: u64,
}

impl EntityRecord {
    fn new(entity: Entity, sequence: u64) -> Self {
        Self {
            entity,
            components: BitMask::new(),
            systems: BitMask::new(),
            enabled: true,
            visible: false,
            sequence,
        }
    }

    /// The entity this record describes.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Bit `k` is set iff the entity carries a value for component kind `k`.
    #[must_use]
    pub fn components(&self) -> &BitMask {
        &self.components
    }

    /// Only component stores may touch the component mask.
    pub(crate) fn components_mut(&mut self) -> &mut BitMask {
        &mut self.components
    }

    /// Systems that currently consider this entity active. A cache of the
    /// systems' own active sets.
    #[must_use]
    pub fn systems(&self) -> &BitMask {
        &self.systems
    }

    /// Mutable access to the system ownership cache.
    pub fn systems_mut(&mut self) -> &mut BitMask {
        &mut self.systems
    }

    /// `false` while the entity is disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the enabled flag.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// `true` once the entity's creation has been announced to systems.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Record that the entity's creation has been announced.
    pub fn mark_visible(&mut self) {
        self.visible = true;
    }

    /// Creation order among all entities created by the owning table.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// The authoritative store of entities.
///
/// Entities are *live* from [`create`](Self::create) until
/// [`retire`](Self::retire). A retired entity keeps its record (so observers
/// can still inspect it while its deletion is being announced) and keeps its
/// id reserved until [`release`](Self::release) hands the id back to the pool.
#[derive(Debug)]
pub struct EntityTable {
    pool: IdPool,
    live: HashMap<Entity, EntityRecord>,
    retired: HashMap<Entity, EntityRecord>,
    /// Creation sequence -> live entity.
    order: BTreeMap<u64, Entity>,
    next_sequence: u64,
}

impl EntityTable {
    /// Create a table whose id pool issues at most `capacity` ids.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            pool: IdPool::new(capacity),
            live: HashMap::new(),
            retired: HashMap::new(),
            order: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Allocate an id and insert an empty, enabled, not-yet-visible record.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapacityExceeded`] if the id pool is
    /// exhausted. The table is left unchanged.
    pub fn create(&mut self) -> Result<Entity, ComponentError> {
        let entity = Entity(self.pool.allocate()?);
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.live.insert(entity, EntityRecord::new(entity, sequence));
        self.order.insert(sequence, entity);
        Ok(entity)
    }

    /// Returns `true` if `entity` is live.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.live.contains_key(&entity)
    }

    /// Returns `true` if `entity` has been retired but not yet released.
    #[must_use]
    pub fn is_retired(&self, entity: Entity) -> bool {
        self.retired.contains_key(&entity)
    }

    /// The record of a live entity.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.live.get(&entity)
    }

    /// Mutable record of a live entity.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.live.get_mut(&entity)
    }

    /// The record of a live or retired entity.
    #[must_use]
    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.live.get(&entity).or_else(|| self.retired.get(&entity))
    }

    /// Mutable record of a live or retired entity.
    pub fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        match self.live.get_mut(&entity) {
            Some(record) => Some(record),
            None => self.retired.get_mut(&entity),
        }
    }

    /// Move a live entity to the retired area. Returns `false` if it was not
    /// live.
    pub fn retire(&mut self, entity: Entity) -> bool {
        let Some(record) = self.live.remove(&entity) else {
            return false;
        };
        self.order.remove(&record.sequence);
        self.retired.insert(entity, record);
        true
    }

    /// Drop a retired entity's record and return its id to the pool.
    pub fn release(&mut self, entity: Entity) -> Option<EntityRecord> {
        let record = self.retired.remove(&entity)?;
        self.pool.free(entity.id());
        Some(record)
    }

    /// Live records in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.order.values().filter_map(|entity| self.live.get(entity))
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl Default for EntityTable {
    fn default() -> Self {
        Self::new(u64::MAX)
    }
}
