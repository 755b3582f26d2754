use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of identifiers for optimistically created records. Injected so the
/// core stays deterministic under test instead of minting time-plus-random
/// ids inline.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Production generator: random v4 UUIDs.
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: `task-1`, `task-2`, ...
#[derive(Debug)]
pub struct SequentialGenerator {
    prefix: &'static str,
    counter: AtomicU64,
}

impl SequentialGenerator {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialGenerator::new("task");
        assert_eq!(ids.next_id(), "task-1");
        assert_eq!(ids.next_id(), "task-2");
    }

    #[test]
    fn uuids_are_distinct() {
        let ids = UuidGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
