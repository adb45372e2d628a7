//! # engine_ecs
//!
//! The behaviour half of the ECS runtime. A [`World`] owns entities and
//! their components, batches every membership-relevant change into pending
//! transition sets, and flushes them once per [`World::tick`] so each
//! system's active set is consistent at a single checkpoint.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use engine_component::{Aspect, ComponentRegistry, Entity};
//! use engine_ecs::{FnSystem, SystemConfig, SystemContext, World};
//! use serde_json::json;
//!
//! let mut registry = ComponentRegistry::new();
//! let pos = registry.register("Pos").unwrap();
//! let mut world = World::new(Arc::new(registry));
//!
//! let aspect = Aspect::builder().require(&pos).build().unwrap();
//! world
//!     .add_system(
//!         SystemConfig::new("movement", aspect),
//!         FnSystem::new(|entities: &[Entity], _ctx: &mut SystemContext<'_>| {
//!             assert_eq!(entities.len(), 1);
//!         }),
//!     )
//!     .unwrap();
//!
//! let e = world.create_entity().unwrap();
//! world.set_component(e, &pos, json!({"x": 1})).unwrap();
//! world.tick(1.0 / 60.0);
//!
//! assert!(world.active_entities("movement").unwrap().contains(&e));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod observer;
pub mod snapshot;
pub mod state;
pub mod system;
pub mod tick;
pub mod transition;
pub mod world;

pub use config::{SystemConfig, WorldConfig};
pub use context::SystemContext;
pub use error::WorldError;
pub use observer::{FnObserver, Observer};
pub use snapshot::{EntitySnapshot, PopulationSnapshot};
pub use state::WorldState;
pub use system::{FnSystem, System, SystemId};
pub use tick::{TickConfig, TickLoop, TickStats};
pub use transition::{PendingSet, PendingSets, Transition};
pub use world::World;
