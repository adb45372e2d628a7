//! Population snapshots.
//!
//! An entity snapshot is the list of `[name, value]` pairs for its attached
//! components in ascending component id order. A population snapshot is the
//! list of entity snapshots of every live entity in creation order:
//!
//! ```text
//! [[["Pos",{"x":1}]],[["Pos",{"x":2}],["Vel",{"dx":0}]]]
//! ```
//!
//! Snapshots carry no entity ids. Loading one creates fresh entities.

use engine_component::{ComponentKind, Entity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::WorldError;
use crate::state::WorldState;

/// The components of one entity as `(name, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySnapshot(pub Vec<(String, Value)>);

/// One [`EntitySnapshot`] per live entity, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationSnapshot(pub Vec<EntitySnapshot>);

impl PopulationSnapshot {
    /// Number of entities in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the snapshot holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl WorldState {
    /// Snapshot a live entity's components.
    #[must_use]
    pub fn entity_snapshot(&self, entity: Entity) -> Option<EntitySnapshot> {
        let record = self.record(entity)?;
        let pairs = self
            .registry()
            .kinds_for_mask(record.components())
            .filter_map(|kind| {
                let value = self.get_component(entity, kind)?;
                Some((kind.name().to_string(), value.clone()))
            })
            .collect();
        Some(EntitySnapshot(pairs))
    }

    /// Snapshot every live entity.
    #[must_use]
    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot(self.entities().filter_map(|entity| self.entity_snapshot(entity)).collect())
    }

    /// Serialise [`snapshot`](Self::snapshot) as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Json`] if a value cannot be written.
    pub fn to_json(&self) -> Result<String, WorldError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Serialise [`snapshot`](Self::snapshot) as MessagePack.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Encode`] if encoding fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, WorldError> {
        Ok(rmp_serde::to_vec(&self.snapshot())?)
    }

    /// Create one entity per entity snapshot, applying its components in
    /// order. Returns the new entities.
    ///
    /// Every name is resolved before anything is created, so an unknown name
    /// leaves the world untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownName`](engine_component::ComponentError::UnknownName)
    /// (wrapped) for an unregistered name, or
    /// [`ComponentError::CapacityExceeded`](engine_component::ComponentError::CapacityExceeded)
    /// if the id pool runs out part way through.
    pub fn load_snapshot(&mut self, snapshot: PopulationSnapshot) -> Result<Vec<Entity>, WorldError> {
        let resolved = snapshot
            .0
            .into_iter()
            .map(|EntitySnapshot(pairs)| {
                pairs
                    .into_iter()
                    .map(|(name, value)| Ok((self.registry().resolve(&name)?, value)))
                    .collect::<Result<Vec<(ComponentKind, Value)>, WorldError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut created = Vec::with_capacity(resolved.len());
        for components in resolved {
            let entity = self.create_entity()?;
            for (kind, value) in components {
                self.set_component(entity, &kind, value)?;
            }
            created.push(entity);
        }
        debug!(entities = created.len(), "snapshot loaded");
        Ok(created)
    }

    /// Parse a JSON population snapshot and load it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Json`] for malformed input, or the errors of
    /// [`load_snapshot`](Self::load_snapshot).
    pub fn load_json(&mut self, json: &str) -> Result<Vec<Entity>, WorldError> {
        let snapshot: PopulationSnapshot = serde_json::from_str(json)?;
        self.load_snapshot(snapshot)
    }

    /// Decode a MessagePack population snapshot and load it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Decode`] for malformed input, or the errors of
    /// [`load_snapshot`](Self::load_snapshot).
    pub fn load_msgpack(&mut self, bytes: &[u8]) -> Result<Vec<Entity>, WorldError> {
        let snapshot: PopulationSnapshot = rmp_serde::from_slice(bytes)?;
        self.load_snapshot(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engine_component::{ComponentError, ComponentRegistry};
    use serde_json::json;

    use crate::World;

    fn registry() -> Arc<ComponentRegistry> {
        let mut registry = ComponentRegistry::new();
        registry.register("Pos").unwrap();
        registry.register("Vel").unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_population_round_trip_is_byte_identical() {
        let registry = registry();
        let pos = registry.resolve("Pos").unwrap();
        let mut world = World::new(Arc::clone(&registry));
        let e1 = world.create_entity().unwrap();
        let e2 = world.create_entity().unwrap();
        world.set_component(e1, &pos, json!({"x": 1})).unwrap();
        world.set_component(e2, &pos, json!({"x": 2})).unwrap();

        let text = world.to_json().unwrap();
        assert_eq!(text, r#"[[["Pos",{"x":1}]],[["Pos",{"x":2}]]]"#);

        let mut fresh = World::new(registry);
        let created = fresh.load_json(&text).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(fresh.to_json().unwrap(), text);
    }

    #[test]
    fn test_components_follow_id_order_not_insertion_order() {
        let registry = registry();
        let (pos, vel) = (registry.resolve("Pos").unwrap(), registry.resolve("Vel").unwrap());
        let mut world = World::new(registry);
        let e = world.create_entity().unwrap();
        world.set_component(e, &vel, json!({"dx": 0})).unwrap();
        world.set_component(e, &pos, json!({"x": 3})).unwrap();

        assert_eq!(
            world.to_json().unwrap(),
            r#"[[["Pos",{"x":3}],["Vel",{"dx":0}]]]"#
        );
    }

    #[test]
    fn test_reused_id_does_not_leak_old_components() {
        let registry = registry();
        let pos = registry.resolve("Pos").unwrap();
        let mut world = World::new(registry);
        let a = world.create_entity().unwrap();
        let b = world.create_entity().unwrap();
        world.set_component(a, &pos, json!({"x": 1})).unwrap();
        world.set_component(b, &pos, json!({"x": 2})).unwrap();
        world.tick(0.0);

        world.delete_entity(a);
        world.tick(0.0);
        let c = world.create_entity().unwrap();
        assert_eq!(c, a);

        assert_eq!(world.to_json().unwrap(), r#"[[["Pos",{"x":2}]],[]]"#);
    }

    #[test]
    fn test_unknown_name_fails_without_creating_anything() {
        let mut world = World::new(registry());
        let err = world
            .load_json(r#"[[["Pos",{"x":1}]],[["Mass",5]]]"#)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::WorldError::Component(ComponentError::UnknownName(name)) if name == "Mass"
        ));
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.pending_count(), 0);
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        let mut world = World::new(registry());
        assert!(matches!(
            world.load_json("[[\"Pos\"]"),
            Err(crate::WorldError::Json(_))
        ));
    }

    #[test]
    fn test_msgpack_round_trip() {
        let registry = registry();
        let vel = registry.resolve("Vel").unwrap();
        let mut world = World::new(Arc::clone(&registry));
        let e = world.create_entity().unwrap();
        world.set_component(e, &vel, json!({"dx": -1.5, "label": "drift"})).unwrap();
        world.create_entity().unwrap();

        let bytes = world.to_msgpack().unwrap();
        let mut fresh = World::new(registry);
        fresh.load_msgpack(&bytes).unwrap();
        assert_eq!(fresh.snapshot(), world.snapshot());
    }

    #[test]
    fn test_malformed_msgpack_is_a_decode_error() {
        let mut world = World::new(registry());
        assert!(matches!(
            world.load_msgpack(&[0xFF, 0xFF]),
            Err(crate::WorldError::Decode(_))
        ));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_entity_snapshot_of_stale_entity_is_none() {
        let mut world = World::new(registry());
        let e = world.create_entity().unwrap();
        assert_eq!(world.entity_snapshot(e).map(|s| s.0.len()), Some(0));
        world.delete_entity(e);
        assert!(world.entity_snapshot(e).is_none());
        assert!(world.snapshot().is_empty());
    }
}
