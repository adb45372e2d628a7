//! Entity state transitions and the deduplicating sets that batch them.

use std::collections::HashSet;

use engine_component::Entity;

/// A kind of entity state change announced to observers and systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// The entity was created.
    Added,
    /// The entity gained or lost a component.
    Changed,
    /// The entity was disabled.
    Disabled,
    /// The entity was (re-)enabled.
    Enabled,
    /// The entity was deleted.
    Deleted,
}

impl Transition {
    /// The fixed order in which pending sets are flushed each tick.
    pub const FLUSH_ORDER: [Transition; 5] = [
        Transition::Added,
        Transition::Changed,
        Transition::Disabled,
        Transition::Enabled,
        Transition::Deleted,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Added => 0,
            Self::Changed => 1,
            Self::Disabled => 2,
            Self::Enabled => 3,
            Self::Deleted => 4,
        }
    }

    /// `true` for transitions after which membership is re-tested against
    /// the aspect; `false` for transitions that always end membership.
    #[must_use]
    pub const fn retests(self) -> bool {
        matches!(self, Self::Added | Self::Changed | Self::Enabled)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// An insertion-ordered set of entities. Enqueuing an entity twice keeps its
/// first position.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    order: Vec<Entity>,
    members: HashSet<Entity>,
}

impl PendingSet {
    /// Add `entity` unless already present.
    pub fn insert(&mut self, entity: Entity) -> bool {
        let inserted = self.members.insert(entity);
        if inserted {
            self.order.push(entity);
        }
        inserted
    }

    /// Returns `true` if `entity` is queued.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Number of queued entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl IntoIterator for PendingSet {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

/// One [`PendingSet`] per [`Transition`].
#[derive(Debug, Clone, Default)]
pub struct PendingSets {
    sets: [PendingSet; 5],
}

impl PendingSets {
    /// Queue `entity` for `transition`.
    pub fn enqueue(&mut self, transition: Transition, entity: Entity) -> bool {
        self.sets[transition.index()].insert(entity)
    }

    /// The set queued for `transition`.
    #[must_use]
    pub fn get(&self, transition: Transition) -> &PendingSet {
        &self.sets[transition.index()]
    }

    /// Remove and return the set queued for `transition`.
    pub fn take_set(&mut self, transition: Transition) -> PendingSet {
        std::mem::take(&mut self.sets[transition.index()])
    }

    /// Total number of queued (entity, transition) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.iter().map(PendingSet::len).sum()
    }

    /// Returns `true` if nothing is queued for any transition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(PendingSet::is_empty)
    }
}
