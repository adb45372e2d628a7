//! Component kinds and the registry that names them.
//!
//! A component kind is a registered, uniquely named data category. Its
//! [`ComponentId`] is assigned sequentially from 0 and doubles as the bit
//! position used in every entity's component [`BitMask`].
//!
//! Registration happens during setup. A registry has no unregister operation
//! and its ids never change once assigned. Each registry owns its own id
//! sequence, so independent registries never collide.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ComponentError;
use crate::mask::BitMask;

/// Stable identity of a component kind; also its bit index in masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// The bit position of this component in a [`BitMask`].
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A registered component kind: `{id, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentKind {
    id: ComponentId,
    name: String,
}

impl ComponentKind {
    /// The kind's stable id.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The kind's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

/// Assigns ids to component names and resolves them back.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_name: HashMap<String, ComponentId>,
    kinds: Vec<ComponentKind>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new component kind under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::DuplicateName`] if `name` is already taken.
    pub fn register(&mut self, name: impl Into<String>) -> Result<ComponentKind, ComponentError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ComponentError::DuplicateName(name));
        }
        let id = ComponentId(self.kinds.len() as u32);
        let kind = ComponentKind {
            id,
            name: name.clone(),
        };
        self.by_name.insert(name, id);
        self.kinds.push(kind.clone());
        Ok(kind)
    }

    /// Look up a kind by name.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownName`] if `name` was never registered.
    pub fn resolve(&self, name: &str) -> Result<ComponentKind, ComponentError> {
        self.by_name
            .get(name)
            .map(|id| self.kinds[id.index()].clone())
            .ok_or_else(|| ComponentError::UnknownName(name.to_string()))
    }

    /// Resolve several names, preserving order. Fails on the first unknown name.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownName`] for the first unregistered name.
    pub fn resolve_many<I, S>(&self, names: I) -> Result<Vec<ComponentKind>, ComponentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| self.resolve(name.as_ref()))
            .collect()
    }

    /// Every registered kind whose bit is set in `mask`, in ascending id order.
    pub fn kinds_for_mask<'a>(&'a self, mask: &'a BitMask) -> impl Iterator<Item = &'a ComponentKind> + 'a {
        mask.iter().filter_map(|bit| self.kinds.get(bit))
    }

    /// Returns the kind with the given id.
    #[must_use]
    pub fn get(&self, id: ComponentId) -> Option<&ComponentKind> {
        self.kinds.get(id.index())
    }

    /// Returns `true` if `kind` was issued by this registry.
    ///
    /// Kinds are compared by `(id, name)`, so a kind from another registry
    /// with the same registration at the same id is indistinguishable.
    #[must_use]
    pub fn contains(&self, kind: &ComponentKind) -> bool {
        self.get(kind.id).is_some_and(|registered| registered == kind)
    }

    /// Iterates over all kinds in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentKind> {
        self.kinds.iter()
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_from_zero() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register("Pos").unwrap();
        let vel = registry.register("Vel").unwrap();
        assert_eq!(pos.id(), ComponentId(0));
        assert_eq!(vel.id(), ComponentId(1));
        assert_eq!(pos.name(), "Pos");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register("Pos").unwrap();
        let err = registry.register("Pos").unwrap_err();
        assert!(matches!(err, ComponentError::DuplicateName(ref n) if n == "Pos"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register("Pos").unwrap();
        assert_eq!(registry.resolve("Pos").unwrap(), pos);
        assert!(matches!(
            registry.resolve("Nope"),
            Err(ComponentError::UnknownName(_))
        ));
    }

    #[test]
    fn test_resolve_many_preserves_order_and_fails_fast() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register("A").unwrap();
        let b = registry.register("B").unwrap();
        assert_eq!(registry.resolve_many(["B", "A"]).unwrap(), vec![b, a]);
        let err = registry.resolve_many(["A", "X", "Y"]).unwrap_err();
        assert!(matches!(err, ComponentError::UnknownName(ref n) if n == "X"));
    }

    #[test]
    fn test_kinds_for_mask_ascending() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register("A").unwrap();
        let _b = registry.register("B").unwrap();
        let c = registry.register("C").unwrap();
        let mask = BitMask::from_bits([c.id().index(), a.id().index(), 99]);
        let names: Vec<&str> = registry.kinds_for_mask(&mask).map(ComponentKind::name).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_independent_registries_do_not_share_ids() {
        let mut first = ComponentRegistry::new();
        let mut second = ComponentRegistry::new();
        first.register("A").unwrap();
        let b = second.register("B").unwrap();
        assert_eq!(b.id(), ComponentId(0));
        assert!(!first.contains(&b));
        assert!(second.contains(&b));
    }
}
