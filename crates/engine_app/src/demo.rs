//! The demo world: moving particles that expire.

use std::sync::Arc;

use anyhow::Result;
use engine_component::{Aspect, ComponentKind, ComponentRegistry, Entity};
use engine_ecs::{Observer, System, SystemConfig, SystemContext, Transition, World};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const MOVEMENT: &str = "movement";
pub const LIFETIME: &str = "lifetime";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f64,
    pub dy: f64,
}

/// Integrates velocity into position.
pub struct Movement {
    position: ComponentKind,
    velocity: ComponentKind,
}

impl System for Movement {
    fn process_entities(&mut self, entities: &[Entity], ctx: &mut SystemContext<'_>) {
        let dt = ctx.dt();
        for &entity in entities {
            let pos = ctx.get_as::<Position>(entity, &self.position);
            let vel = ctx.get_as::<Velocity>(entity, &self.velocity);
            match (pos, vel) {
                (Ok(Some(pos)), Ok(Some(vel))) => {
                    let next = Position {
                        x: pos.x + vel.dx * dt,
                        y: pos.y + vel.dy * dt,
                    };
                    if let Err(err) = ctx.set_as(entity, &self.position, &next) {
                        warn!(%entity, %err, "failed to store position");
                    }
                }
                (Err(err), _) | (_, Err(err)) => warn!(%entity, %err, "malformed movement components"),
                _ => {}
            }
        }
    }
}

/// Counts down a per-entity lifetime in seconds and deletes expired entities.
pub struct Lifetime {
    lifetime: ComponentKind,
    expired: usize,
}

impl Lifetime {
    /// Number of entities this system has deleted.
    #[must_use]
    pub fn expired(&self) -> usize {
        self.expired
    }
}

impl System for Lifetime {
    fn removed(&mut self, entity: Entity, ctx: &mut SystemContext<'_>) {
        if !ctx.contains(entity) {
            info!(%entity, tick_id = ctx.tick_id(), "particle expired");
        }
    }

    fn process_entities(&mut self, entities: &[Entity], ctx: &mut SystemContext<'_>) {
        let dt = ctx.dt();
        for &entity in entities {
            let Some(remaining) = ctx
                .get_component_mut(entity, &self.lifetime)
                .and_then(|value| {
                    let left = value.as_f64()? - dt;
                    *value = serde_json::json!(left);
                    Some(left)
                })
            else {
                continue;
            };
            if remaining <= 0.0 && ctx.delete_entity(entity) {
                self.expired += 1;
            }
        }
    }
}

/// Logs entity arrivals and departures.
#[derive(Default)]
pub struct Census {
    pub added: usize,
    pub deleted: usize,
}

impl Observer for Census {
    fn on_transition(&mut self, _entity: Entity, transition: Transition, _ctx: &mut SystemContext<'_>) {
        match transition {
            Transition::Added => self.added += 1,
            Transition::Deleted => self.deleted += 1,
            _ => {}
        }
    }
}

/// Build a world with `particles` moving entities, each living a little
/// longer than the last.
pub fn build_world(particles: usize) -> Result<World> {
    let mut registry = ComponentRegistry::new();
    let position = registry.register("Position")?;
    let velocity = registry.register("Velocity")?;
    let lifetime = registry.register("Lifetime")?;
    let mut world = World::new(Arc::new(registry));

    world.add_observer("census", Census::default())?;
    world.add_system(
        SystemConfig::new(
            MOVEMENT,
            Aspect::builder().require(&position).require(&velocity).build()?,
        ),
        Movement {
            position: position.clone(),
            velocity: velocity.clone(),
        },
    )?;
    world.add_system(
        SystemConfig::new(LIFETIME, Aspect::builder().require(&lifetime).build()?).with_priority(100),
        Lifetime {
            lifetime: lifetime.clone(),
            expired: 0,
        },
    )?;

    for i in 0..particles {
        let entity = world.create_entity()?;
        let spread = i as f64;
        world.set_as(entity, &position, &Position::default())?;
        world.set_as(entity, &velocity, &Velocity { dx: spread, dy: 1.0 })?;
        world.set_as(entity, &lifetime, &(0.25 * (spread + 1.0)))?;
    }
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particles_move_and_expire() {
        let mut world = build_world(2).unwrap();
        let position = world.registry().resolve("Position").unwrap();

        world.tick(0.1);
        let first = world.entities().next().unwrap();
        let pos: Position = world.get_as(first, &position).unwrap().unwrap();
        assert!((pos.y - 0.1).abs() < 1e-9);

        // Lifetimes are 0.25s and 0.5s.
        for _ in 0..10 {
            world.tick(0.1);
        }
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.system::<Lifetime>(LIFETIME).unwrap().expired(), 2);

        let census = world.observer::<Census>("census").unwrap();
        assert_eq!(census.added, 2);
        assert_eq!(census.deleted, 2);
    }
}
