use std::fmt;

use crossbeam_utils::CachePadded;

use crate::sync::atomic::{AtomicU64, Ordering};

/// The eviction/activation counter shared by all entries of one
/// (domain, partition) pair.
///
/// Every eviction and every activation in the partition advances the clock,
/// so the difference between two readings counts how many entries were
/// evicted or activated in between. That difference is the refault distance.
///
/// The counter wraps silently. Readings must only ever be compared with
/// `u64::wrapping_sub`, which keeps distances meaningful across the wrap.
/// Increments are relaxed: only the per-clock ordering matters, and no other
/// memory is published through it.
pub struct AccessClock {
    inactive_age: CachePadded<AtomicU64>,
}

impl AccessClock {
    pub fn new() -> AccessClock {
        AccessClock::starting_at(0)
    }

    /// A clock whose next bump returns `value + 1`. Lets tests and hosts
    /// position a clock near the wrap boundary.
    pub fn starting_at(value: u64) -> AccessClock {
        AccessClock {
            inactive_age: CachePadded::new(AtomicU64::new(value)),
        }
    }

    /// Advances the clock and returns the new reading.
    #[inline]
    pub fn bump(&self) -> u64 {
        self.inactive_age
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    /// The current reading, without advancing the clock.
    #[inline]
    pub fn read(&self) -> u64 {
        self.inactive_age.load(Ordering::Relaxed)
    }
}

impl Default for AccessClock {
    fn default() -> AccessClock {
        AccessClock::new()
    }
}

impl fmt::Debug for AccessClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessClock").field(&self.read()).finish()
    }
}
