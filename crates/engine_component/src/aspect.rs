//! Aspects: membership predicates over component masks.
//!
//! A system declares an [`Aspect`] at registration time. The orchestrator
//! tests the aspect against an entity's component mask whenever the entity's
//! membership may have changed, and the system's active set follows the
//! result.
//!
//! Evaluation short-circuits in this order:
//!
//! ```text
//! mask & required == required
//! mask & excluded == 0
//! popcount(mask & one_of) == 1        (only if a one_of group is declared)
//! ```
//!
//! Optional components take no part in matching. They only declare what the
//! owning system is allowed to read.

use std::collections::HashMap;

use crate::component::{ComponentId, ComponentKind};
use crate::error::{AspectClause, ComponentError};
use crate::mask::BitMask;

/// A validated membership predicate.
///
/// Clauses are pairwise disjoint; this is checked once by
/// [`AspectBuilder::build`] and never re-checked by [`Aspect::matches`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aspect {
    required: BitMask,
    excluded: BitMask,
    optional: BitMask,
    one_of: Option<BitMask>,
}

impl Aspect {
    /// Start building an aspect.
    #[must_use]
    pub fn builder() -> AspectBuilder {
        AspectBuilder::default()
    }

    /// An aspect that every entity satisfies.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Test a component mask against this aspect.
    #[must_use]
    pub fn matches(&self, mask: &BitMask) -> bool {
        if !mask.contains_all(&self.required) {
            return false;
        }
        if mask.intersects(&self.excluded) {
            return false;
        }
        match &self.one_of {
            Some(group) => mask.intersection_count(group) == 1,
            None => true,
        }
    }

    /// Components that must all be present.
    #[must_use]
    pub fn required(&self) -> &BitMask {
        &self.required
    }

    /// Components that must all be absent.
    #[must_use]
    pub fn excluded(&self) -> &BitMask {
        &self.excluded
    }

    /// Components the system may read if present.
    #[must_use]
    pub fn optional(&self) -> &BitMask {
        &self.optional
    }

    /// The exclusive group, if one was declared.
    #[must_use]
    pub fn one_of(&self) -> Option<&BitMask> {
        self.one_of.as_ref()
    }

    /// Every component a matching entity may expose to the system:
    /// required, optional and the exclusive group.
    #[must_use]
    pub fn readable(&self) -> BitMask {
        let readable = self.required.union(&self.optional);
        match &self.one_of {
            Some(group) => readable.union(group),
            None => readable,
        }
    }
}

/// Collects component kinds per clause and validates them into an [`Aspect`].
#[derive(Debug, Clone, Default)]
pub struct AspectBuilder {
    clauses: Vec<(AspectClause, ComponentKind)>,
}

impl AspectBuilder {
    /// Require `kind` to be present.
    #[must_use]
    pub fn require(self, kind: &ComponentKind) -> Self {
        self.with(AspectClause::Required, kind)
    }

    /// Require `kind` to be absent.
    #[must_use]
    pub fn exclude(self, kind: &ComponentKind) -> Self {
        self.with(AspectClause::Excluded, kind)
    }

    /// Declare `kind` as readable without filtering on it.
    #[must_use]
    pub fn optional(self, kind: &ComponentKind) -> Self {
        self.with(AspectClause::Optional, kind)
    }

    /// Add `kind` to the exclusive group.
    #[must_use]
    pub fn one_of(self, kind: &ComponentKind) -> Self {
        self.with(AspectClause::OneOf, kind)
    }

    /// Require every kind in `kinds`.
    #[must_use]
    pub fn all_of(self, kinds: &[ComponentKind]) -> Self {
        self.with_all(AspectClause::Required, kinds)
    }

    /// Exclude every kind in `kinds`.
    #[must_use]
    pub fn none_of(self, kinds: &[ComponentKind]) -> Self {
        self.with_all(AspectClause::Excluded, kinds)
    }

    /// Declare every kind in `kinds` as optional.
    #[must_use]
    pub fn any_optional(self, kinds: &[ComponentKind]) -> Self {
        self.with_all(AspectClause::Optional, kinds)
    }

    /// Put every kind in `kinds` in the exclusive group.
    #[must_use]
    pub fn one_of_all(self, kinds: &[ComponentKind]) -> Self {
        self.with_all(AspectClause::OneOf, kinds)
    }

    fn with(mut self, clause: AspectClause, kind: &ComponentKind) -> Self {
        self.clauses.push((clause, kind.clone()));
        self
    }

    fn with_all(self, clause: AspectClause, kinds: &[ComponentKind]) -> Self {
        kinds.iter().fold(self, |builder, kind| builder.with(clause, kind))
    }

    /// Validate and build the aspect.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::InvalidAspect`] if any component appears in
    /// two different clauses.
    pub fn build(self) -> Result<Aspect, ComponentError> {
        let mut seen: HashMap<ComponentId, AspectClause> = HashMap::new();
        let mut aspect = Aspect::default();
        let mut one_of = BitMask::new();

        for (clause, kind) in self.clauses {
            match seen.get(&kind.id()) {
                Some(&first) if first != clause => {
                    return Err(ComponentError::InvalidAspect {
                        component: kind.name().to_string(),
                        first,
                        second: clause,
                    });
                }
                Some(_) => continue,
                None => {
                    seen.insert(kind.id(), clause);
                }
            }
            let bit = kind.id().index();
            match clause {
                AspectClause::Required => aspect.required.set(bit),
                AspectClause::Excluded => aspect.excluded.set(bit),
                AspectClause::Optional => aspect.optional.set(bit),
                AspectClause::OneOf => one_of.set(bit),
            }
        }

        if !one_of.is_empty() {
            aspect.one_of = Some(one_of);
        }
        Ok(aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentRegistry;

    fn kinds(names: &[&str]) -> Vec<ComponentKind> {
        let mut registry = ComponentRegistry::new();
        names.iter().map(|n| registry.register(*n).unwrap()).collect()
    }

    fn mask(of: &[&ComponentKind]) -> BitMask {
        BitMask::from_bits(of.iter().map(|k| k.id().index()))
    }

    #[test]
    fn test_required_and_excluded() {
        let k = kinds(&["A", "B", "C"]);
        let (a, b, c) = (&k[0], &k[1], &k[2]);
        let aspect = Aspect::builder().require(a).require(b).exclude(c).build().unwrap();

        assert!(aspect.matches(&mask(&[a, b])));
        assert!(!aspect.matches(&mask(&[a, b, c])));
        assert!(!aspect.matches(&mask(&[a])));
    }

    #[test]
    fn test_one_of_means_exactly_one() {
        let k = kinds(&["X", "Y"]);
        let (x, y) = (&k[0], &k[1]);
        let aspect = Aspect::builder().one_of_all(&[x.clone(), y.clone()]).build().unwrap();

        assert!(aspect.matches(&mask(&[x])));
        assert!(aspect.matches(&mask(&[y])));
        assert!(!aspect.matches(&mask(&[x, y])));
        assert!(!aspect.matches(&mask(&[])));
    }

    #[test]
    fn test_empty_one_of_group_is_skipped() {
        let aspect = Aspect::builder().one_of_all(&[]).build().unwrap();
        assert!(aspect.one_of().is_none());
        assert!(aspect.matches(&BitMask::new()));
    }

    #[test]
    fn test_optional_does_not_filter() {
        let k = kinds(&["A", "O"]);
        let (a, o) = (&k[0], &k[1]);
        let aspect = Aspect::builder().require(a).optional(o).build().unwrap();
        assert!(aspect.matches(&mask(&[a])));
        assert!(aspect.matches(&mask(&[a, o])));
        assert!(!aspect.matches(&mask(&[o])));
    }

    #[test]
    fn test_any_matches_everything() {
        let k = kinds(&["A"]);
        assert!(Aspect::any().matches(&BitMask::new()));
        assert!(Aspect::any().matches(&mask(&[&k[0]])));
    }

    #[test]
    fn test_overlap_rejected_at_build() {
        let k = kinds(&["A", "B"]);
        let err = Aspect::builder().require(&k[0]).exclude(&k[0]).build().unwrap_err();
        match err {
            ComponentError::InvalidAspect {
                component,
                first,
                second,
            } => {
                assert_eq!(component, "A");
                assert_eq!(first, AspectClause::Required);
                assert_eq!(second, AspectClause::Excluded);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(Aspect::builder().exclude(&k[1]).optional(&k[1]).build().is_err());
        assert!(Aspect::builder().require(&k[1]).one_of(&k[1]).build().is_err());
    }

    #[test]
    fn test_repeating_a_kind_in_one_clause_is_fine() {
        let k = kinds(&["A"]);
        let aspect = Aspect::builder().require(&k[0]).require(&k[0]).build().unwrap();
        assert_eq!(aspect.required().count(), 1);
    }

    #[test]
    fn test_readable() {
        let k = kinds(&["R", "E", "O", "X"]);
        let aspect = Aspect::builder()
            .require(&k[0])
            .exclude(&k[1])
            .optional(&k[2])
            .one_of(&k[3])
            .build()
            .unwrap();
        assert_eq!(aspect.readable().iter().collect::<Vec<_>>(), vec![0, 2, 3]);
    }
}
