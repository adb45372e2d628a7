//! Per-call context handed to system and observer hooks.

use std::ops::{Deref, DerefMut};

use crate::state::WorldState;

/// Context provided to every hook during a tick.
///
/// Dereferences to [`WorldState`], so hooks create and delete entities,
/// toggle them and edit components through it. Whatever they change is
/// queued and announced on the next tick.
#[derive(Debug)]
pub struct SystemContext<'w> {
    tick_id: u64,
    dt: f64,
    state: &'w mut WorldState,
}

impl<'w> SystemContext<'w> {
    /// Create a context for a tick.
    #[must_use]
    pub fn new(tick_id: u64, dt: f64, state: &'w mut WorldState) -> Self {
        Self { tick_id, dt, state }
    }

    /// The current tick ID. Zero while systems are being added.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Delta time passed to the current tick, in seconds.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl Deref for SystemContext<'_> {
    type Target = WorldState;

    fn deref(&self) -> &WorldState {
        self.state
    }
}

impl DerefMut for SystemContext<'_> {
    fn deref_mut(&mut self) -> &mut WorldState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engine_component::ComponentRegistry;
    use serde_json::json;

    use super::*;
    use crate::transition::Transition;

    #[test]
    fn test_context_creation() {
        let mut state = WorldState::new(Arc::new(ComponentRegistry::new()), u64::MAX);
        let ctx = SystemContext::new(1, 0.016, &mut state);
        assert_eq!(ctx.tick_id(), 1);
        assert!((ctx.dt() - 0.016).abs() < f64::EPSILON);
        assert_eq!(ctx.entity_count(), 0);
    }

    #[test]
    fn test_mutations_through_context_are_queued() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register("Pos").unwrap();
        let mut state = WorldState::new(Arc::new(registry), u64::MAX);

        let mut ctx = SystemContext::new(3, 0.0, &mut state);
        let e = ctx.create_entity().unwrap();
        ctx.set_component(e, &pos, json!({"x": 1})).unwrap();

        assert!(state.is_pending(Transition::Added, e));
        assert!(state.is_pending(Transition::Changed, e));
    }
}
