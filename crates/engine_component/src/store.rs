//! Sparse per-kind component value storage.
//!
//! One [`ComponentStore`] exists per component kind. Values are opaque
//! `serde_json::Value`s keyed by entity. The store keeps the owning entity's
//! component mask in step with its own contents: an entity is present in the
//! store for kind `k` iff bit `k` is set in its mask.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde_json::Value;

use crate::component::ComponentKind;
use crate::entity::{Entity, EntityRecord};

/// Whether a store operation changed the entity's component membership.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// A value was inserted or removed; the mask bit flipped.
    Changed,
    /// A value was replaced in place, or nothing happened.
    Unchanged,
}

impl Membership {
    /// Returns `true` for [`Membership::Changed`].
    #[must_use]
    pub fn is_changed(self) -> bool {
        self == Self::Changed
    }
}

/// Sparse storage for the values of a single component kind.
#[derive(Debug, Clone)]
pub struct ComponentStore {
    kind: ComponentKind,
    values: HashMap<Entity, Value>,
}

impl ComponentStore {
    /// Create an empty store for `kind`.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            values: HashMap::new(),
        }
    }

    /// The kind stored here.
    #[must_use]
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Attach or replace the value for `record`'s entity.
    ///
    /// Replacing an existing value is not a membership change. Inserting sets
    /// the mask bit and reports [`Membership::Changed`].
    pub fn set(&mut self, record: &mut EntityRecord, value: Value) -> (&Value, Membership) {
        match self.values.entry(record.entity()) {
            Entry::Occupied(mut slot) => {
                slot.insert(value);
                (slot.into_mut(), Membership::Unchanged)
            }
            Entry::Vacant(slot) => {
                record.components_mut().set(self.kind.id().index());
                (slot.insert(value), Membership::Changed)
            }
        }
    }

    /// Detach the value for `record`'s entity, clearing the mask bit.
    /// A no-op if the entity has no value here.
    pub fn unset(&mut self, record: &mut EntityRecord) -> Membership {
        if self.values.remove(&record.entity()).is_none() {
            return Membership::Unchanged;
        }
        record.components_mut().clear(self.kind.id().index());
        Membership::Changed
    }

    /// Drop a value without touching any mask. Used when a retired entity's
    /// record is about to be discarded.
    pub fn purge(&mut self, entity: Entity) -> Option<Value> {
        self.values.remove(&entity)
    }

    /// The value attached to `entity`, if any.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&Value> {
        self.values.get(&entity)
    }

    /// Mutable access to the value in place. Editing a value is never a
    /// membership change.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut Value> {
        self.values.get_mut(&entity)
    }

    /// Returns `true` if `entity` has a value here.
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.values.contains_key(&entity)
    }

    /// Iterates over `(entity, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &Value)> {
        self.values.iter().map(|(entity, value)| (*entity, value))
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
