//! # engine_component
//!
//! The data half of the ECS runtime: what a component kind is, how entities
//! carry components, and how component membership is tested.
//!
//! This crate provides:
//!
//! - [`BitMask`] — growable bitset used for component and system membership.
//! - [`IdPool`] — recycling integer id allocator.
//! - [`ComponentRegistry`] — assigns stable ids to named [`ComponentKind`]s.
//! - [`Entity`] / [`EntityTable`] — entity identity and the authoritative
//!   per-entity record store.
//! - [`ComponentStore`] — sparse value storage that keeps masks in step.
//! - [`Aspect`] — membership predicate over component masks.

pub mod aspect;
pub mod component;
pub mod entity;
pub mod error;
pub mod id_pool;
pub mod mask;
pub mod store;

pub use aspect::{Aspect, AspectBuilder};
pub use component::{ComponentId, ComponentKind, ComponentRegistry};
pub use entity::{Entity, EntityRecord, EntityTable};
pub use error::{AspectClause, ComponentError};
pub use id_pool::IdPool;
pub use mask::BitMask;
pub use store::{ComponentStore, Membership};
