//! Fixed-timestep tick driver and per-tick reporting.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WorldError;
use crate::transition::Transition;
use crate::world::World;

/// What one call to [`World::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    /// The tick this report belongs to.
    pub tick_id: u64,
    /// Entities dispatched by the `added` flush.
    pub added: usize,
    /// Entities dispatched by the `changed` flush.
    pub changed: usize,
    /// Entities dispatched by the `disabled` flush.
    pub disabled: usize,
    /// Entities dispatched by the `enabled` flush.
    pub enabled: usize,
    /// Entities dispatched by the `deleted` flush.
    pub deleted: usize,
    /// Systems whose process pass ran.
    pub processed: usize,
}

impl TickStats {
    pub(crate) fn new(tick_id: u64) -> Self {
        Self {
            tick_id,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, transition: Transition, dispatched: usize) {
        let slot = match transition {
            Transition::Added => &mut self.added,
            Transition::Changed => &mut self.changed,
            Transition::Disabled => &mut self.disabled,
            Transition::Enabled => &mut self.enabled,
            Transition::Deleted => &mut self.deleted,
        };
        *slot += dispatched;
    }

    /// Entities dispatched across all five flushes.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.added + self.changed + self.disabled + self.enabled + self.deleted
    }
}

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Drives a [`World`] at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    config: TickConfig,
    world: World,
}

impl TickLoop {
    /// Create a new tick loop around `world`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidTickRate`] unless `config.tick_rate` is
    /// finite and positive.
    pub fn new(config: TickConfig, world: World) -> Result<Self, WorldError> {
        if !(config.tick_rate.is_finite() && config.tick_rate > 0.0) {
            return Err(WorldError::InvalidTickRate(config.tick_rate));
        }
        Ok(Self { config, world })
    }

    /// Returns the world's current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.world.tick_id()
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns a mutable reference to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Consume the loop and hand back the world.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    ///
    /// Every tick is passed the nominal step `1 / tick_rate` as its delta.
    pub fn run(&mut self) {
        let tick_duration = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            let dt = tick_duration.as_secs_f64();
            self.world.tick(dt);

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.world.tick_id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engine_component::ComponentRegistry;

    use super::*;

    fn empty_world() -> World {
        World::new(Arc::new(ComponentRegistry::new()))
    }

    #[test]
    fn test_run_limited_ticks() {
        let config = TickConfig {
            tick_rate: 1000.0, // fast for testing
            max_ticks: 5,
        };
        let mut tick_loop = TickLoop::new(config, empty_world()).unwrap();
        tick_loop.run();
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[test]
    fn test_world_mut_reaches_the_driven_world() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), empty_world()).unwrap();
        let e = tick_loop.world_mut().create_entity().unwrap();
        tick_loop.world_mut().tick(0.0);
        assert!(tick_loop.world().contains(e));
        assert_eq!(tick_loop.into_world().tick_id(), 1);
    }

    #[test]
    fn test_rejects_unusable_tick_rates() {
        for tick_rate in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let config = TickConfig {
                tick_rate,
                max_ticks: 1,
            };
            assert!(matches!(
                TickLoop::new(config, empty_world()),
                Err(WorldError::InvalidTickRate(_))
            ));
        }
    }

    #[test]
    fn test_stats_record_per_transition() {
        let mut stats = TickStats::new(7);
        stats.record(Transition::Added, 2);
        stats.record(Transition::Deleted, 1);
        assert_eq!(stats.tick_id, 7);
        assert_eq!(stats.added, 2);
        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.dispatched(), 3);
    }
}
