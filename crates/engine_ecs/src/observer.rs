//! Observers: listeners notified of every entity transition.

use std::any::Any;

use engine_component::Entity;

use crate::context::SystemContext;
use crate::transition::Transition;

/// Receives every flushed transition, before any system does.
///
/// Observers have no aspect and no active set. They see each transition of
/// each entity once per tick, in flush order.
pub trait Observer: Any {
    /// Called once when the observer is added to a world.
    fn initialize(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// Called for each flushed `(entity, transition)` pair.
    fn on_transition(&mut self, entity: Entity, transition: Transition, ctx: &mut SystemContext<'_>);
}

pub(crate) trait AnyObserver: Observer {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Observer> AnyObserver for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An observer built from a closure.
pub struct FnObserver<F> {
    f: F,
}

impl<F> FnObserver<F>
where
    F: FnMut(Entity, Transition, &mut SystemContext<'_>) + 'static,
{
    /// Wrap `f` as an observer.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Observer for FnObserver<F>
where
    F: FnMut(Entity, Transition, &mut SystemContext<'_>) + 'static,
{
    fn on_transition(&mut self, entity: Entity, transition: Transition, ctx: &mut SystemContext<'_>) {
        (self.f)(entity, transition, ctx);
    }
}

pub(crate) struct ObserverSlot {
    pub(crate) key: String,
    pub(crate) observer: Box<dyn AnyObserver>,
}

impl std::fmt::Debug for ObserverSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSlot")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
