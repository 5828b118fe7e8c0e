//! Lock-free state primitives shared between demand and completion threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Outstanding, unfulfilled consumer demand.
///
/// Saturates at `u64::MAX` instead of wrapping, which also makes
/// `u64::MAX` behave as unbounded demand.
#[derive(Debug, Default)]
pub(crate) struct DemandCounter {
    value: AtomicU64,
}

impl DemandCounter {
    pub(crate) fn add(&self, n: u64) {
        // fetch_update only fails when the closure returns None
        let _ = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some(cur.saturating_add(n))
            });
    }

    pub(crate) fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Decrement by one, never below zero. Unbounded demand stays unbounded.
    pub(crate) fn consume_one(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| match cur {
                0 | u64::MAX => None,
                n => Some(n - 1),
            });
    }
}

/// Open/Closed flag. Monotonic.
#[derive(Debug, Default)]
pub(crate) struct LifecycleFlag {
    closed: AtomicBool,
}

impl LifecycleFlag {
    /// Returns `true` only for the caller that moved the flag to Closed.
    pub(crate) fn close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Single-owner token guarding the one outstanding read.
#[derive(Debug, Default)]
pub(crate) struct ReadToken {
    in_flight: AtomicBool,
}

impl ReadToken {
    pub(crate) fn try_acquire(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}
