//! Recycling integer id allocator.

use std::collections::BTreeSet;

use tracing::warn;

use crate::error::ComponentError;

/// Hands out integer ids, reusing freed ones before issuing fresh ones.
///
/// Every id ever issued is either live (held by a caller) or in the freed
/// set, never both. Freed ids are reused lowest-first so allocation order is
/// deterministic.
///
/// Freeing an id that was never issued, or freeing it twice, is a caller bug.
/// The pool ignores such calls and logs a warning instead of corrupting its
/// state.
#[derive(Debug, Clone)]
pub struct IdPool {
    next_fresh: u64,
    freed: BTreeSet<u64>,
    capacity: u64,
}

impl IdPool {
    /// Create a pool that issues at most `capacity` distinct ids.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            next_fresh: 0,
            freed: BTreeSet::new(),
            capacity,
        }
    }

    /// Allocate an id.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapacityExceeded`] when no freed id is
    /// available and `capacity` fresh ids have already been issued.
    pub fn allocate(&mut self) -> Result<u64, ComponentError> {
        if let Some(id) = self.freed.pop_first() {
            return Ok(id);
        }
        if self.next_fresh < self.capacity {
            let id = self.next_fresh;
            self.next_fresh += 1;
            return Ok(id);
        }
        Err(ComponentError::CapacityExceeded {
            capacity: self.capacity,
        })
    }

    /// Return `id` to the pool.
    pub fn free(&mut self, id: u64) {
        if id >= self.next_fresh {
            warn!(id, "ignoring free of an id that was never issued");
            return;
        }
        if !self.freed.insert(id) {
            warn!(id, "ignoring double free of id");
        }
    }

    /// Number of ids currently issued and not freed.
    #[must_use]
    pub fn live_count(&self) -> u64 {
        self.next_fresh - self.freed.len() as u64
    }

    /// Returns `true` if `id` is waiting in the freed set.
    #[must_use]
    pub fn is_free(&self, id: u64) -> bool {
        self.freed.contains(&id)
    }

    /// The configured capacity.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl Default for IdPool {
    fn default() -> Self {
        Self::new(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_sequential() {
        let mut pool = IdPool::default();
        assert_eq!(pool.allocate().unwrap(), 0);
        assert_eq!(pool.allocate().unwrap(), 1);
        assert_eq!(pool.allocate().unwrap(), 2);
        assert_eq!(pool.live_count(), 3);
    }

    #[test]
    fn test_freed_id_is_reused_first() {
        let mut pool = IdPool::default();
        let a = pool.allocate().unwrap();
        let _b = pool.allocate().unwrap();
        pool.free(a);
        assert!(pool.is_free(a));
        assert_eq!(pool.allocate().unwrap(), a);
        assert_eq!(pool.allocate().unwrap(), 2);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut pool = IdPool::new(2);
        pool.allocate().unwrap();
        pool.allocate().unwrap();
        let err = pool.allocate().unwrap_err();
        assert!(matches!(err, ComponentError::CapacityExceeded { capacity: 2 }));
        // The failed attempt leaves the pool usable once an id is freed.
        pool.free(1);
        assert_eq!(pool.allocate().unwrap(), 1);
    }

    #[test]
    fn test_zero_capacity() {
        let mut pool = IdPool::new(0);
        assert!(pool.allocate().is_err());
    }

    #[test]
    fn test_invalid_free_is_ignored() {
        let mut pool = IdPool::default();
        let a = pool.allocate().unwrap();
        pool.free(42);
        assert!(!pool.is_free(42));
        pool.free(a);
        pool.free(a);
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.allocate().unwrap(), a);
        assert_eq!(pool.allocate().unwrap(), 1);
    }

    #[test]
    fn test_no_two_live_ids_collide() {
        let mut pool = IdPool::new(8);
        let mut live = Vec::new();
        for round in 0..32u64 {
            if round % 3 == 2 {
                if let Some(id) = live.pop() {
                    pool.free(id);
                }
            } else if let Ok(id) = pool.allocate() {
                assert!(!live.contains(&id));
                live.push(id);
            }
        }
        assert_eq!(pool.live_count(), live.len() as u64);
    }
}
