//! The mutable data half of a world.
//!
//! [`WorldState`] owns the entity table, the per-kind component stores, the
//! pending transition sets and every system's active set. Mutations apply to
//! the table immediately; the transitions they cause are only queued here and
//! announced when the [`World`](crate::World) next ticks.
//!
//! Operations on entities that are no longer live are silent no-ops.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use engine_component::{
    ComponentError, ComponentKind, ComponentRegistry, ComponentStore, Entity, EntityRecord,
    EntityTable,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::error::WorldError;
use crate::system::SystemId;
use crate::transition::{PendingSets, Transition};

/// Entities, components, pending transitions and system memberships.
#[derive(Debug)]
pub struct WorldState {
    registry: Arc<ComponentRegistry>,
    table: EntityTable,
    /// Indexed by component id.
    stores: Vec<ComponentStore>,
    pending: PendingSets,
    memberships: HashMap<SystemId, BTreeSet<Entity>>,
    system_keys: HashMap<String, SystemId>,
}

impl WorldState {
    pub(crate) fn new(registry: Arc<ComponentRegistry>, entity_capacity: u64) -> Self {
        let stores = registry.iter().cloned().map(ComponentStore::new).collect();
        Self {
            registry,
            table: EntityTable::new(entity_capacity),
            stores,
            pending: PendingSets::default(),
            memberships: HashMap::new(),
            system_keys: HashMap::new(),
        }
    }

    /// The component registry this world was built with.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// A shared handle to the registry, for building sibling worlds.
    #[must_use]
    pub fn registry_handle(&self) -> Arc<ComponentRegistry> {
        Arc::clone(&self.registry)
    }

    // -- Entity lifecycle --

    /// Create an empty entity and queue its `added` transition.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapacityExceeded`] (wrapped) if the id pool
    /// is exhausted.
    pub fn create_entity(&mut self) -> Result<Entity, WorldError> {
        let entity = self.table.create()?;
        self.pending.enqueue(Transition::Added, entity);
        trace!(%entity, "entity created");
        Ok(entity)
    }

    /// Delete a live entity.
    ///
    /// The entity leaves the live table immediately, so later mutations of it
    /// are ignored. Its components are purged and its id returned to the pool
    /// when the `deleted` transition is flushed. Returns `false` for an entity
    /// that is not live.
    pub fn delete_entity(&mut self, entity: Entity) -> bool {
        if !self.table.retire(entity) {
            trace!(%entity, "ignoring delete of stale entity");
            return false;
        }
        self.pending.enqueue(Transition::Deleted, entity);
        true
    }

    /// Enable a live entity. Returns `false` for an entity that is not live.
    pub fn enable(&mut self, entity: Entity) -> bool {
        self.toggle(entity, true)
    }

    /// Disable a live entity. Disabled entities stay in the table but are not
    /// eligible for any system. Returns `false` for an entity that is not live.
    pub fn disable(&mut self, entity: Entity) -> bool {
        self.toggle(entity, false)
    }

    fn toggle(&mut self, entity: Entity, enabled: bool) -> bool {
        let Some(record) = self.table.get_mut(entity) else {
            trace!(%entity, enabled, "ignoring toggle of stale entity");
            return false;
        };
        record.set_enabled(enabled);
        let transition = if enabled {
            Transition::Enabled
        } else {
            Transition::Disabled
        };
        self.pending.enqueue(transition, entity);
        true
    }

    /// Returns `true` if `entity` is live.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.table.contains(entity)
    }

    /// Returns `true` if `entity` is live and enabled.
    #[must_use]
    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.table.get(entity).is_some_and(EntityRecord::is_enabled)
    }

    /// The record of a live entity.
    #[must_use]
    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.table.get(entity)
    }

    /// Live entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.table.iter().map(EntityRecord::entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.table.len()
    }

    pub(crate) fn table(&self) -> &EntityTable {
        &self.table
    }

    // -- Component operations --

    fn store_index(&self, kind: &ComponentKind) -> Result<usize, WorldError> {
        if self.registry.contains(kind) {
            Ok(kind.id().index())
        } else {
            Err(ComponentError::UnknownName(kind.name().to_string()).into())
        }
    }

    /// Attach `value` to `entity` under `kind`, replacing any previous value.
    ///
    /// Only a newly attached kind queues a `changed` transition. Returns the
    /// stored value, or `None` if `entity` is not live.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownName`] (wrapped) if `kind` does not
    /// belong to this world's registry.
    pub fn set_component(
        &mut self,
        entity: Entity,
        kind: &ComponentKind,
        value: Value,
    ) -> Result<Option<&Value>, WorldError> {
        let index = self.store_index(kind)?;
        let Some(record) = self.table.get_mut(entity) else {
            trace!(%entity, component = kind.name(), "ignoring set on stale entity");
            return Ok(None);
        };
        let (stored, membership) = self.stores[index].set(record, value);
        if membership.is_changed() {
            self.pending.enqueue(Transition::Changed, entity);
        }
        Ok(Some(stored))
    }

    /// [`set_component`](Self::set_component) with the kind looked up by name.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownName`] (wrapped) for an unregistered name.
    pub fn set_component_by_name(
        &mut self,
        entity: Entity,
        name: &str,
        value: Value,
    ) -> Result<Option<&Value>, WorldError> {
        let kind = self.registry.resolve(name)?;
        self.set_component(entity, &kind, value)
    }

    /// Serialise `value` to JSON and attach it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Json`] if `value` cannot be represented as JSON,
    /// or the errors of [`set_component`](Self::set_component).
    pub fn set_as<T: Serialize>(
        &mut self,
        entity: Entity,
        kind: &ComponentKind,
        value: &T,
    ) -> Result<Option<&Value>, WorldError> {
        let value = serde_json::to_value(value)?;
        self.set_component(entity, kind, value)
    }

    /// Detach `kind` from `entity`. Returns `true` if a value was removed.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownName`] (wrapped) if `kind` does not
    /// belong to this world's registry.
    pub fn unset_component(&mut self, entity: Entity, kind: &ComponentKind) -> Result<bool, WorldError> {
        let index = self.store_index(kind)?;
        let Some(record) = self.table.get_mut(entity) else {
            return Ok(false);
        };
        let changed = self.stores[index].unset(record).is_changed();
        if changed {
            self.pending.enqueue(Transition::Changed, entity);
        }
        Ok(changed)
    }

    /// [`unset_component`](Self::unset_component) with the kind looked up by name.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownName`] (wrapped) for an unregistered name.
    pub fn unset_component_by_name(&mut self, entity: Entity, name: &str) -> Result<bool, WorldError> {
        let kind = self.registry.resolve(name)?;
        self.unset_component(entity, &kind)
    }

    /// Detach every component from a live entity. Returns `true` if anything
    /// was removed.
    pub fn remove_all_components(&mut self, entity: Entity) -> bool {
        let Some(record) = self.table.get_mut(entity) else {
            return false;
        };
        let bits: Vec<usize> = record.components().iter().collect();
        let mut changed = false;
        for bit in bits {
            if let Some(store) = self.stores.get_mut(bit) {
                changed |= store.unset(record).is_changed();
            }
        }
        if changed {
            self.pending.enqueue(Transition::Changed, entity);
        }
        changed
    }

    /// The value of `kind` on `entity`.
    ///
    /// Entities whose deletion has not been flushed yet can still be read, so
    /// `removed` hooks see the last values.
    #[must_use]
    pub fn get_component(&self, entity: Entity, kind: &ComponentKind) -> Option<&Value> {
        if !self.registry.contains(kind) || self.table.record(entity).is_none() {
            return None;
        }
        self.stores[kind.id().index()].get(entity)
    }

    /// Mutable access to the value of `kind` on a live entity. Editing a
    /// value in place queues nothing.
    pub fn get_component_mut(&mut self, entity: Entity, kind: &ComponentKind) -> Option<&mut Value> {
        if !self.registry.contains(kind) || !self.table.contains(entity) {
            return None;
        }
        self.stores[kind.id().index()].get_mut(entity)
    }

    /// Deserialise the value of `kind` on `entity` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Json`] if the stored value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(
        &self,
        entity: Entity,
        kind: &ComponentKind,
    ) -> Result<Option<T>, WorldError> {
        self.get_component(entity, kind)
            .map(|value| T::deserialize(value).map_err(WorldError::from))
            .transpose()
    }

    /// Returns `true` if a live entity carries `kind`.
    #[must_use]
    pub fn has_component(&self, entity: Entity, kind: &ComponentKind) -> bool {
        self.table
            .get(entity)
            .is_some_and(|record| record.components().has(kind.id().index()))
            && self.registry.contains(kind)
    }

    /// The kinds attached to a live entity, in ascending id order.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> Vec<ComponentKind> {
        self.table
            .get(entity)
            .map(|record| self.registry.kinds_for_mask(record.components()).cloned().collect())
            .unwrap_or_default()
    }

    /// The store for `kind`.
    #[must_use]
    pub fn store(&self, kind: &ComponentKind) -> Option<&ComponentStore> {
        if self.registry.contains(kind) {
            self.stores.get(kind.id().index())
        } else {
            None
        }
    }

    // -- Pending transitions --

    /// Returns `true` if `entity` is queued for `transition` in the next tick.
    #[must_use]
    pub fn is_pending(&self, transition: Transition, entity: Entity) -> bool {
        self.pending.get(transition).contains(entity)
    }

    /// Total number of queued transitions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn take_pending(&mut self) -> PendingSets {
        std::mem::take(&mut self.pending)
    }

    /// Whether a queued `transition` for `entity` may still be dispatched.
    /// Deletions need a retired record; everything else needs a live one.
    pub(crate) fn accepts(&self, transition: Transition, entity: Entity) -> bool {
        match transition {
            Transition::Deleted => self.table.is_retired(entity),
            _ => self.table.contains(entity),
        }
    }

    pub(crate) fn mark_visible(&mut self, entity: Entity) {
        if let Some(record) = self.table.get_mut(entity) {
            record.mark_visible();
        }
    }

    /// Drop a retired entity: purge its component values and free its id.
    pub(crate) fn release(&mut self, entity: Entity) {
        let Some(record) = self.table.release(entity) else {
            return;
        };
        for bit in record.components().iter() {
            if let Some(store) = self.stores.get_mut(bit) {
                store.purge(entity);
            }
        }
        for bit in record.systems().iter() {
            if let Some(active) = self.memberships.get_mut(&SystemId(bit as u32)) {
                active.remove(&entity);
            }
        }
        trace!(%entity, "entity released");
    }

    // -- System memberships --

    /// The active set of the system registered under `key`.
    #[must_use]
    pub fn active_entities(&self, key: &str) -> Option<&BTreeSet<Entity>> {
        let id = self.system_keys.get(key)?;
        self.memberships.get(id)
    }

    /// The id of the system registered under `key`.
    #[must_use]
    pub fn system_id(&self, key: &str) -> Option<SystemId> {
        self.system_keys.get(key).copied()
    }

    /// The live members of `system`'s active set, in id order. Entities
    /// deleted earlier in the tick are left out until their removal is flushed.
    pub(crate) fn active_of(&self, system: SystemId) -> Vec<Entity> {
        self.memberships
            .get(&system)
            .map(|active| {
                active
                    .iter()
                    .copied()
                    .filter(|entity| self.table.contains(*entity))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` if the `added` flush has reached `entity`. Deleted
    /// entities keep the flag until they are released.
    pub(crate) fn was_visible(&self, entity: Entity) -> bool {
        self.table.record(entity).is_some_and(EntityRecord::is_visible)
    }

    /// Returns `true` if `system` currently owns `entity`.
    #[must_use]
    pub fn owns(&self, system: SystemId, entity: Entity) -> bool {
        self.table
            .record(entity)
            .is_some_and(|record| record.systems().has(system.index()))
    }

    pub(crate) fn register_system_key(&mut self, key: &str, system: SystemId) -> bool {
        if self.system_keys.contains_key(key) {
            return false;
        }
        self.system_keys.insert(key.to_string(), system);
        self.memberships.insert(system, BTreeSet::new());
        true
    }

    /// Forget a system's key and hand back its active set.
    pub(crate) fn unregister_system_key(&mut self, key: &str) -> Option<(SystemId, BTreeSet<Entity>)> {
        let system = self.system_keys.remove(key)?;
        let active = self.memberships.remove(&system).unwrap_or_default();
        Some((system, active))
    }

    pub(crate) fn insert_active(&mut self, system: SystemId, entity: Entity) {
        self.memberships.entry(system).or_default().insert(entity);
        if let Some(record) = self.table.record_mut(entity) {
            record.systems_mut().set(system.index());
        }
    }

    pub(crate) fn remove_active(&mut self, system: SystemId, entity: Entity) {
        if let Some(active) = self.memberships.get_mut(&system) {
            active.remove(&entity);
        }
        if let Some(record) = self.table.record_mut(entity) {
            record.systems_mut().clear(system.index());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn state(names: &[&str]) -> (WorldState, Vec<ComponentKind>) {
        let mut registry = ComponentRegistry::new();
        let kinds = names.iter().map(|n| registry.register(*n).unwrap()).collect();
        (WorldState::new(Arc::new(registry), u64::MAX), kinds)
    }

    #[test]
    fn test_remove_all_components_queues_one_change() {
        let (mut state, kinds) = state(&["A", "B", "C"]);
        let (a, b) = (&kinds[0], &kinds[1]);
        let e = state.create_entity().unwrap();
        state.set_component(e, b, json!(2)).unwrap();
        state.set_component(e, a, json!(1)).unwrap();
        let names: Vec<String> = state.components_of(e).iter().map(|k| k.name().to_string()).collect();
        assert_eq!(names, vec!["A", "B"]);

        // Start from an empty queue so the bulk unset is counted alone.
        let _ = state.take_pending();
        assert!(state.remove_all_components(e));
        assert_eq!(state.pending_count(), 1);
        assert!(state.is_pending(Transition::Changed, e));
        assert!(!state.has_component(e, a));
        assert!(!state.has_component(e, b));
        assert!(state.record(e).unwrap().components().is_empty());
        assert!(state.store(a).unwrap().is_empty());
        assert!(state.store(b).unwrap().is_empty());
        assert!(state.components_of(e).is_empty());

        assert!(!state.remove_all_components(e));
        assert_eq!(state.pending_count(), 1);
    }

    #[test]
    fn test_by_name_helpers() {
        let (mut state, kinds) = state(&["Pos"]);
        let e = state.create_entity().unwrap();
        let _ = state.take_pending();

        assert_eq!(state.set_component_by_name(e, "Pos", json!({"x": 1})).unwrap(), Some(&json!({"x": 1})));
        assert!(state.has_component(e, &kinds[0]));
        assert!(state.unset_component_by_name(e, "Pos").unwrap());
        assert!(!state.has_component(e, &kinds[0]));
        assert_eq!(state.pending_count(), 1);

        assert!(matches!(
            state.set_component_by_name(e, "Mass", json!(5)),
            Err(WorldError::Component(ComponentError::UnknownName(name))) if name == "Mass"
        ));
        assert!(matches!(
            state.unset_component_by_name(e, "Mass"),
            Err(WorldError::Component(ComponentError::UnknownName(_)))
        ));
    }

    #[test]
    fn test_in_place_edit_queues_nothing() {
        let (mut state, kinds) = state(&["Hp"]);
        let hp = &kinds[0];
        let e = state.create_entity().unwrap();
        state.set_component(e, hp, json!(10)).unwrap();
        let _ = state.take_pending();

        if let Some(value) = state.get_component_mut(e, hp) {
            *value = json!(7);
        }
        assert_eq!(state.get_component(e, hp), Some(&json!(7)));
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_typed_helpers() {
        let (mut state, kinds) = state(&["Pair"]);
        let pair = &kinds[0];
        let e = state.create_entity().unwrap();
        state.set_as(e, pair, &(3_u32, "three")).unwrap();
        let back: Option<(u32, String)> = state.get_as(e, pair).unwrap();
        assert_eq!(back, Some((3, "three".to_string())));
        assert!(matches!(state.get_as::<bool>(e, pair), Err(WorldError::Json(_))));
    }

    #[test]
    fn test_foreign_kind_is_rejected() {
        let (mut state, _) = state(&["A"]);
        let mut other = ComponentRegistry::new();
        other.register("Z").unwrap();
        let foreign = other.register("Y").unwrap();
        let e = state.create_entity().unwrap();
        assert!(state.set_component(e, &foreign, json!(1)).is_err());
        assert!(state.get_component(e, &foreign).is_none());
    }
}
