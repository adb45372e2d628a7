//! Systems: behaviour bound to an aspect.
//!
//! A [`System`] supplies hooks and per-tick work. The world wraps every
//! registered system in a [`SystemSlot`] that owns its aspect, priority and
//! passive flag and keeps its active set in step with entity transitions.

use std::any::Any;

use engine_component::{Aspect, Entity};
use tracing::trace;

use crate::context::SystemContext;
use crate::transition::Transition;

/// Per-world sequential system identity; also the system's bit in each
/// entity's ownership mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u32);

impl SystemId {
    /// The bit position of this system in an entity's ownership mask.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Behaviour run over the entities matching an aspect.
///
/// Every hook except [`process_entities`](Self::process_entities) has an
/// empty default. Mutations made through the context from any hook are
/// announced on the next tick.
pub trait System: Any {
    /// Called once when the system is added to a world.
    fn initialize(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// Called after `entity` joined the active set.
    fn inserted(&mut self, _entity: Entity, _ctx: &mut SystemContext<'_>) {}

    /// Called after `entity` left the active set.
    fn removed(&mut self, _entity: Entity, _ctx: &mut SystemContext<'_>) {}

    /// Return `false` to skip this tick's processing.
    fn check_processing(&mut self, _dt: f64) -> bool {
        true
    }

    /// Called before [`process_entities`](Self::process_entities).
    fn begin(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// The per-tick work, run once over the active set in entity id order.
    fn process_entities(&mut self, entities: &[Entity], ctx: &mut SystemContext<'_>);

    /// Called after [`process_entities`](Self::process_entities).
    fn end(&mut self, _ctx: &mut SystemContext<'_>) {}
}

/// Object-safe access to a boxed system's concrete type.
pub(crate) trait AnySystem: System {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: System> AnySystem for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A system built from a closure.
///
/// ```rust
/// use engine_ecs::{FnSystem, SystemContext};
/// use engine_component::Entity;
///
/// let counter = FnSystem::new(|entities: &[Entity], _ctx: &mut SystemContext<'_>| {
///     println!("{} active", entities.len());
/// });
/// # let _ = counter;
/// ```
pub struct FnSystem<F> {
    f: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&[Entity], &mut SystemContext<'_>) + 'static,
{
    /// Wrap `f` as a system.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&[Entity], &mut SystemContext<'_>) + 'static,
{
    fn process_entities(&mut self, entities: &[Entity], ctx: &mut SystemContext<'_>) {
        (self.f)(entities, ctx);
    }
}

/// A registered system together with its membership state.
pub(crate) struct SystemSlot {
    pub(crate) id: SystemId,
    pub(crate) key: String,
    pub(crate) priority: i64,
    pub(crate) passive: bool,
    pub(crate) aspect: Aspect,
    pub(crate) system: Box<dyn AnySystem>,
}

impl SystemSlot {
    /// Ordering key: ascending priority, then registration order.
    pub(crate) fn order(&self) -> (i64, SystemId) {
        (self.priority, self.id)
    }

    /// Returns `true` if `entity` is live, enabled and matches the aspect.
    fn eligible(&self, entity: Entity, ctx: &SystemContext<'_>) -> bool {
        ctx.table()
            .get(entity)
            .is_some_and(|record| record.is_enabled() && self.aspect.matches(record.components()))
    }

    /// Update the active set for one transition of `entity`.
    pub(crate) fn on_transition(&mut self, entity: Entity, transition: Transition, ctx: &mut SystemContext<'_>) {
        let owned = ctx.owns(self.id, entity);
        let keep = transition.retests() && self.eligible(entity, ctx);

        if keep && !owned {
            self.insert(entity, ctx);
        } else if !keep && owned {
            self.remove(entity, ctx);
        } else {
            trace!(system = self.key, %entity, %transition, "membership unchanged");
        }
    }

    pub(crate) fn insert(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        ctx.insert_active(self.id, entity);
        trace!(system = self.key, %entity, "entity inserted");
        self.system.inserted(entity, ctx);
    }

    pub(crate) fn remove(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        ctx.remove_active(self.id, entity);
        trace!(system = self.key, %entity, "entity removed");
        self.system.removed(entity, ctx);
    }

    /// Run one tick of processing. Returns `false` if the system skipped it.
    pub(crate) fn process(&mut self, ctx: &mut SystemContext<'_>) -> bool {
        if !self.system.check_processing(ctx.dt()) {
            trace!(system = self.key, "processing skipped");
            return false;
        }
        let entities = ctx.active_of(self.id);
        self.system.begin(ctx);
        self.system.process_entities(&entities, ctx);
        self.system.end(ctx);
        true
    }
}

impl std::fmt::Debug for SystemSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemSlot")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("priority", &self.priority)
            .field("passive", &self.passive)
            .field("aspect", &self.aspect)
            .finish_non_exhaustive()
    }
}
