//! World and system configuration.

use engine_component::Aspect;

/// Configuration for a [`World`](crate::World).
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Maximum number of entity ids the world's id pool may issue.
    pub entity_capacity: u64,
}

impl WorldConfig {
    /// Override the entity id capacity.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: u64) -> Self {
        self.entity_capacity = capacity;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: u64::MAX,
        }
    }
}

/// Registration parameters for a system.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Stable key the system is registered and looked up under.
    pub key: String,
    /// Which entities the system is interested in.
    pub aspect: Aspect,
    /// Processing order, ascending. Defaults to the system's sequential id.
    pub priority: Option<i64>,
    /// Passive systems track membership but are skipped by the process pass.
    pub passive: bool,
}

impl SystemConfig {
    /// Create a new system config with the given key and aspect.
    #[must_use]
    pub fn new(key: impl Into<String>, aspect: Aspect) -> Self {
        Self {
            key: key.into(),
            aspect,
            priority: None,
            passive: false,
        }
    }

    /// Set an explicit priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark the system as passive.
    #[must_use]
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_config_defaults() {
        let config = SystemConfig::new("movement", Aspect::any());
        assert_eq!(config.key, "movement");
        assert!(config.priority.is_none());
        assert!(!config.passive);
    }

    #[test]
    fn test_system_config_builders() {
        let config = SystemConfig::new("query", Aspect::any())
            .with_priority(-3)
            .passive();
        assert_eq!(config.priority, Some(-3));
        assert!(config.passive);
    }

    #[test]
    fn test_world_config() {
        assert_eq!(WorldConfig::default().entity_capacity, u64::MAX);
        let config = WorldConfig::default().with_entity_capacity(16);
        assert_eq!(config.entity_capacity, 16);
    }
}
