use crate::domain::EntityId;
use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Process-unique connection id for log correlation.
pub fn conn_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    counter.fetch_add(1, Ordering::Relaxed)
}

/// Hands out entity ids above everything the loaded snapshot already uses.
#[derive(Debug)]
pub struct EntityIdAllocator {
    next: AtomicU64,
}

impl EntityIdAllocator {
    pub fn starting_at(first: EntityId) -> Self {
        Self {
            next: AtomicU64::new(first.0),
        }
    }

    pub fn next(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_ids_are_allocated_then_they_are_sequential_from_the_start() {
        let ids = EntityIdAllocator::starting_at(EntityId(1011));

        assert_eq!(ids.next(), EntityId(1011));
        assert_eq!(ids.next(), EntityId(1012));
    }

    #[test]
    fn when_conn_ids_are_drawn_then_they_never_repeat() {
        let a = conn_id();
        let b = conn_id();

        assert_ne!(a, b);
    }
}
