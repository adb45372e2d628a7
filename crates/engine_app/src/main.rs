//! # engine_app — Demo driver
//!
//! Builds a small world, registers a movement system and a lifetime system,
//! and runs the fixed-timestep tick loop for a bounded number of ticks.
//!
//! Set `RUST_LOG=engine_ecs=debug` to watch each flush.

mod demo;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_ecs::{TickConfig, TickLoop};

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    info!("engine demo starting");

    let world = demo::build_world(8)?;
    let config = TickConfig {
        tick_rate: 60.0,
        max_ticks: 120,
    };

    let mut tick_loop = TickLoop::new(config, world)?;
    tick_loop.run();

    let world = tick_loop.world();
    info!(
        ticks = world.tick_id(),
        entities = world.entity_count(),
        moving = world.active_entities(demo::MOVEMENT).map_or(0, |set| set.len()),
        expired = world.system::<demo::Lifetime>(demo::LIFETIME).map_or(0, demo::Lifetime::expired),
        "engine demo finished"
    );
    if let Some(census) = world.observer::<demo::Census>("census") {
        info!(added = census.added, deleted = census.deleted, "census");
    }
    info!(snapshot = %world.to_json()?, "final population");
    Ok(())
}
