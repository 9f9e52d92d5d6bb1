//! Fixed-capacity accumulator pool with blocking claim.
//!
//! One output frame claims one accumulator for exclusive use; different
//! in-flight frames run on separate instances in parallel. The pool bounds
//! peak memory for large accumulation targets: when every slot is claimed,
//! `claim` blocks the caller until a lease drops. That wait is deliberate
//! backpressure, not an error path, and has no timeout.
//!
//! Exclusive `&mut` access through the lease is what serializes the
//! per-frame accumulate calls that the splat itself does not synchronize.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex};

use crate::accumulator::OverlappedAccumulator;

struct PoolInner {
    /// `None` marks a slot whose accumulator is currently leased out.
    slots: Mutex<Vec<Option<OverlappedAccumulator>>>,
    available: Condvar,
}

/// Shared handle to a pool of reusable accumulators.
#[derive(Clone)]
pub struct AccumulatorPool {
    inner: Arc<PoolInner>,
}

impl AccumulatorPool {
    /// Create a pool holding `capacity` accumulator instances.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "accumulator pool requires capacity > 0");
        Self {
            inner: Arc::new(PoolInner {
                slots: Mutex::new((0..capacity).map(|_| Some(OverlappedAccumulator::new())).collect()),
                available: Condvar::new(),
            }),
        }
    }

    /// Claim an accumulator, blocking until one is free.
    pub fn claim(&self) -> AccumulatorLease {
        let mut slots = self
            .inner
            .slots
            .lock()
            .expect("accumulator pool lock poisoned");
        loop {
            if let Some(lease) = take_free_slot(&mut slots, &self.inner) {
                return lease;
            }
            log::debug!("accumulator pool exhausted, blocking until a frame completes");
            slots = self
                .inner
                .available
                .wait(slots)
                .expect("accumulator pool lock poisoned");
        }
    }

    /// Claim an accumulator if one is free right now.
    pub fn try_claim(&self) -> Option<AccumulatorLease> {
        let mut slots = self
            .inner
            .slots
            .lock()
            .expect("accumulator pool lock poisoned");
        take_free_slot(&mut slots, &self.inner)
    }

    /// Number of instances not currently leased.
    pub fn free_count(&self) -> usize {
        self.inner
            .slots
            .lock()
            .expect("accumulator pool lock poisoned")
            .iter()
            .filter(|s| s.is_some())
            .count()
    }
}

fn take_free_slot(
    slots: &mut Vec<Option<OverlappedAccumulator>>,
    inner: &Arc<PoolInner>,
) -> Option<AccumulatorLease> {
    let index = slots.iter().position(|s| s.is_some())?;
    let accumulator = slots[index].take();
    Some(AccumulatorLease {
        pool: Arc::clone(inner),
        slot: index,
        accumulator,
    })
}

/// Exclusive ownership of one pooled accumulator; returns it on drop.
///
/// The accumulator keeps its allocated planes across leases, so a frame at
/// the same resolution skips reallocation.
pub struct AccumulatorLease {
    pool: Arc<PoolInner>,
    slot: usize,
    accumulator: Option<OverlappedAccumulator>,
}

impl Deref for AccumulatorLease {
    type Target = OverlappedAccumulator;

    fn deref(&self) -> &Self::Target {
        self.accumulator.as_ref().expect("lease holds accumulator")
    }
}

impl DerefMut for AccumulatorLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.accumulator.as_mut().expect("lease holds accumulator")
    }
}

impl Drop for AccumulatorLease {
    fn drop(&mut self) {
        let mut slots = self
            .pool
            .slots
            .lock()
            .expect("accumulator pool lock poisoned");
        slots[self.slot] = self.accumulator.take();
        self.pool.available.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_claim_respects_capacity() {
        let pool = AccumulatorPool::new(2);
        let a = pool.try_claim();
        let b = pool.try_claim();
        assert!(a.is_some() && b.is_some());
        assert!(pool.try_claim().is_none());
        drop(a);
        assert!(pool.try_claim().is_some());
    }

    #[test]
    fn test_lease_keeps_allocation() {
        let pool = AccumulatorPool::new(1);
        {
            let mut lease = pool.claim();
            lease.init_memory(16, 16, 3);
        }
        let lease = pool.claim();
        assert_eq!(lease.plane_size(), (16, 16));
    }
}
