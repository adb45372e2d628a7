//! The orchestrator.
//!
//! A [`World`] owns a [`WorldState`] plus the registered observers and
//! systems. Mutations go straight to the state and queue transitions;
//! [`World::tick`] flushes the queued transitions in a fixed order and then
//! runs every non-passive system:
//!
//! ```text
//! added -> changed -> disabled -> enabled -> deleted -> process
//! ```
//!
//! Each flush notifies every observer, then every system, for each queued
//! entity. The whole pending queue is taken at the start of the tick, so
//! anything a hook enqueues is flushed on the next tick.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use engine_component::{ComponentRegistry, Entity, EntityRecord};
use tracing::{debug, info, trace};

use crate::config::{SystemConfig, WorldConfig};
use crate::context::SystemContext;
use crate::error::WorldError;
use crate::observer::{Observer, ObserverSlot};
use crate::state::WorldState;
use crate::system::{System, SystemId, SystemSlot};
use crate::tick::TickStats;
use crate::transition::Transition;

/// Entities, components, observers and systems, advanced one tick at a time.
///
/// Dereferences to [`WorldState`] for entity and component operations.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    state: WorldState,
    /// Sorted by ascending `(priority, id)`.
    systems: Vec<SystemSlot>,
    observers: Vec<ObserverSlot>,
    next_system_id: u32,
    tick_id: u64,
}

impl World {
    /// Create a world over `registry` with the default configuration.
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self::with_config(registry, WorldConfig::default())
    }

    /// Create a world over `registry`.
    #[must_use]
    pub fn with_config(registry: Arc<ComponentRegistry>, config: WorldConfig) -> Self {
        let state = WorldState::new(registry, config.entity_capacity);
        Self {
            config,
            state,
            systems: Vec::new(),
            observers: Vec::new(),
            next_system_id: 0,
            tick_id: 0,
        }
    }

    /// The configuration this world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    // -- Systems --

    /// Register a system.
    ///
    /// The system is initialized, then seeded with every live, enabled entity
    /// that systems have already seen and that matches its aspect.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateSystem`] if `config.key` is taken, and
    /// [`WorldError::ForeignAspect`] if the aspect names a bit this world's
    /// registry never issued. Kinds carry only their `(id, name)`, so an
    /// aspect built from a sibling registry with identical registrations is
    /// accepted.
    pub fn add_system(&mut self, config: SystemConfig, system: impl System) -> Result<SystemId, WorldError> {
        let SystemConfig {
            key,
            aspect,
            priority,
            passive,
        } = config;

        let known = self.state.registry().len();
        let mentioned = aspect.readable().union(aspect.excluded());
        if let Some(bit) = mentioned.iter().find(|&bit| bit >= known) {
            return Err(WorldError::ForeignAspect { system: key, bit });
        }

        let id = SystemId(self.next_system_id);
        if !self.state.register_system_key(&key, id) {
            return Err(WorldError::DuplicateSystem(key));
        }
        self.next_system_id += 1;

        let mut slot = SystemSlot {
            id,
            key,
            priority: priority.unwrap_or(i64::from(id.0)),
            passive,
            aspect,
            system: Box::new(system),
        };

        let mut ctx = SystemContext::new(self.tick_id, 0.0, &mut self.state);
        slot.system.initialize(&mut ctx);

        let seeds: Vec<Entity> = ctx
            .table()
            .iter()
            .filter(|record| record.is_visible() && record.is_enabled() && slot.aspect.matches(record.components()))
            .map(EntityRecord::entity)
            .collect();
        for &entity in &seeds {
            slot.insert(entity, &mut ctx);
        }

        info!(
            system = slot.key,
            id = id.0,
            priority = slot.priority,
            passive = slot.passive,
            seeded = seeds.len(),
            "system added"
        );

        let position = self.systems.partition_point(|other| other.order() < slot.order());
        self.systems.insert(position, slot);
        Ok(id)
    }

    /// Unregister the system under `key`, firing its `removed` hook for every
    /// entity it still owns. Returns `false` if no such system exists.
    pub fn remove_system(&mut self, key: &str) -> bool {
        let Some(position) = self.systems.iter().position(|slot| slot.key == key) else {
            return false;
        };
        let mut slot = self.systems.remove(position);
        let active = self
            .state
            .unregister_system_key(key)
            .map(|(_, active)| active)
            .unwrap_or_default();

        let mut ctx = SystemContext::new(self.tick_id, 0.0, &mut self.state);
        for &entity in &active {
            slot.remove(entity, &mut ctx);
        }

        info!(system = key, released = active.len(), "system removed");
        true
    }

    /// The system under `key`, if it has type `T`.
    #[must_use]
    pub fn system<T: System>(&self, key: &str) -> Option<&T> {
        self.systems
            .iter()
            .find(|slot| slot.key == key)?
            .system
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutable access to the system under `key`, if it has type `T`.
    pub fn system_mut<T: System>(&mut self, key: &str) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find(|slot| slot.key == key)?
            .system
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Keys of the registered systems in processing order.
    pub fn system_keys(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|slot| slot.key.as_str())
    }

    // -- Observers --

    /// Register an observer. Observers are notified in registration order,
    /// before any system.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateObserver`] if `key` is taken.
    pub fn add_observer(&mut self, key: impl Into<String>, observer: impl Observer) -> Result<(), WorldError> {
        let key = key.into();
        if self.observers.iter().any(|slot| slot.key == key) {
            return Err(WorldError::DuplicateObserver(key));
        }
        let mut slot = ObserverSlot {
            key,
            observer: Box::new(observer),
        };
        let mut ctx = SystemContext::new(self.tick_id, 0.0, &mut self.state);
        slot.observer.initialize(&mut ctx);

        info!(observer = slot.key, "observer added");
        self.observers.push(slot);
        Ok(())
    }

    /// Unregister the observer under `key`. Returns `false` if none exists.
    pub fn remove_observer(&mut self, key: &str) -> bool {
        let before = self.observers.len();
        self.observers.retain(|slot| slot.key != key);
        let removed = self.observers.len() != before;
        if removed {
            info!(observer = key, "observer removed");
        }
        removed
    }

    /// The observer under `key`, if it has type `T`.
    #[must_use]
    pub fn observer<T: Observer>(&self, key: &str) -> Option<&T> {
        self.observers
            .iter()
            .find(|slot| slot.key == key)?
            .observer
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutable access to the observer under `key`, if it has type `T`.
    pub fn observer_mut<T: Observer>(&mut self, key: &str) -> Option<&mut T> {
        self.observers
            .iter_mut()
            .find(|slot| slot.key == key)?
            .observer
            .as_any_mut()
            .downcast_mut::<T>()
    }

    // -- Tick --

    /// Run one full update cycle: flush every pending set in order, then
    /// process each non-passive system by ascending priority.
    pub fn tick(&mut self, dt: f64) -> TickStats {
        self.tick_id += 1;
        let Self {
            state,
            systems,
            observers,
            tick_id,
            ..
        } = self;
        let tick_id = *tick_id;

        let mut ctx = SystemContext::new(tick_id, dt, state);
        let mut pending = ctx.take_pending();
        let mut stats = TickStats::new(tick_id);

        for transition in Transition::FLUSH_ORDER {
            let mut dispatched = 0;
            for entity in pending.take_set(transition) {
                if !ctx.accepts(transition, entity) {
                    trace!(%entity, %transition, "skipping stale transition");
                    continue;
                }
                match transition {
                    Transition::Added => ctx.mark_visible(entity),
                    Transition::Deleted if !ctx.was_visible(entity) => {
                        // Never announced, so nobody is told it is gone.
                        ctx.release(entity);
                        continue;
                    }
                    _ => {}
                }

                dispatch(entity, transition, observers, systems, &mut ctx);
                dispatched += 1;

                if transition == Transition::Deleted {
                    ctx.release(entity);
                }
            }
            if dispatched > 0 {
                debug!(tick_id, %transition, dispatched, "flushed");
            }
            stats.record(transition, dispatched);
        }

        for slot in systems.iter_mut().filter(|slot| !slot.passive) {
            if slot.process(&mut ctx) {
                stats.processed += 1;
            }
        }

        debug!(
            tick_id,
            dt,
            dispatched = stats.dispatched(),
            processed = stats.processed,
            queued = ctx.pending_count(),
            "tick complete"
        );
        stats
    }
}

/// Notify observers, then systems, of one transition. Table membership is
/// re-checked before every call since any hook may delete the entity.
fn dispatch(
    entity: Entity,
    transition: Transition,
    observers: &mut [ObserverSlot],
    systems: &mut [SystemSlot],
    ctx: &mut SystemContext<'_>,
) {
    for slot in observers.iter_mut() {
        if !ctx.accepts(transition, entity) {
            return;
        }
        trace!(observer = slot.key, %entity, %transition, "notify observer");
        slot.observer.on_transition(entity, transition, ctx);
    }
    for slot in systems.iter_mut() {
        if !ctx.accepts(transition, entity) {
            return;
        }
        slot.on_transition(entity, transition, ctx);
    }
}

impl Deref for World {
    type Target = WorldState;

    fn deref(&self) -> &WorldState {
        &self.state
    }
}

impl DerefMut for World {
    fn deref_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }
}
