//! Pooled monotonic entropy sources.
//!
//! A [`MonotonicEntropy`] fills the 80 random bits of a ULID. Within a single
//! clock millisecond it does not draw fresh randomness; it adds a bounded
//! random increment to the previous value instead, so ids minted back to back
//! by the same source sort in creation order.
//!
//! Sources are kept in an [`EntropyPool`]. The pool is a LIFO free list, which
//! means a sequential caller keeps getting the same instance back. Concurrent
//! callers may each hold a different instance, so ordering inside one
//! millisecond is only guaranteed among calls served by the same source.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};
use ulid::Ulid;

/// Number of random bits in a ULID.
pub const RANDOM_BITS: u32 = 80;

/// Largest value the random field can hold.
pub const MAX_RANDOM: u128 = (1 << RANDOM_BITS) - 1;

/// Largest timestamp (in milliseconds) a ULID can hold.
pub const MAX_TIMESTAMP_MS: u64 = (1 << 48) - 1;

/// Sources created by this process, mixed into each seed.
static SOURCES_CREATED: AtomicU64 = AtomicU64::new(0);

static GLOBAL_POOL: EntropyPool = EntropyPool::new();

/// A seeded random source that keeps ULIDs monotonic within a millisecond.
#[derive(Debug)]
pub struct MonotonicEntropy {
    rng: StdRng,
    inc: u64,
    last: Option<Last>,
}

/// The clock reading and the value emitted by the previous call.
#[derive(Debug, Clone, Copy)]
struct Last {
    clock_ms: u64,
    value: u128,
}

impl MonotonicEntropy {
    /// Creates a source seeded from the wall clock.
    ///
    /// The increment bound is derived from the same nanosecond reading.
    #[must_use]
    pub fn new() -> Self {
        let nanos = Utc::now()
            .timestamp_nanos_opt()
            .map_or(0, |ns| ns.unsigned_abs());
        let created = SOURCES_CREATED.fetch_add(1, Ordering::Relaxed);
        // Two sources seeded in the same nanosecond must still diverge.
        let seed = nanos ^ created.wrapping_mul(0x9E37_79B9_7F4A_7C15);

        Self::with_seed(seed, nanos % u64::from(u32::MAX))
    }

    /// Creates a source with an explicit seed and increment bound.
    ///
    /// An `inc` of zero means `u32::MAX`.
    #[must_use]
    pub fn with_seed(seed: u64, inc: u64) -> Self {
        let inc = if inc == 0 { u64::from(u32::MAX) } else { inc };
        Self {
            rng: StdRng::seed_from_u64(seed),
            inc,
            last: None,
        }
    }

    /// Returns the upper bound of the per-call increment.
    #[must_use]
    pub fn increment_bound(&self) -> u64 {
        self.inc
    }

    /// Produces the next ULID for the given clock reading.
    ///
    /// Repeated calls with the same `timestamp_ms` return strictly
    /// increasing values. When the random field runs out the carry moves
    /// into the timestamp field, so the encoded time may lead the clock by
    /// a millisecond. Timestamps are masked to 48 bits.
    pub fn next(&mut self, timestamp_ms: u64) -> Ulid {
        let timestamp_ms = timestamp_ms & MAX_TIMESTAMP_MS;

        let value = match self.last {
            Some(last) if last.clock_ms == timestamp_ms => self.step(last.value),
            _ => {
                let random = self.rng.random::<u128>() & MAX_RANDOM;
                Ulid::from_parts(timestamp_ms, random).0
            }
        };

        self.last = Some(Last {
            clock_ms: timestamp_ms,
            value,
        });
        Ulid(value)
    }

    fn step(&mut self, previous: u128) -> u128 {
        let delta = u128::from(self.rng.random_range(1..=self.inc));
        let value = previous.saturating_add(delta);

        if value >> RANDOM_BITS != previous >> RANDOM_BITS {
            debug!(
                timestamp_ms = (previous >> RANDOM_BITS) as u64,
                "random field exhausted, carrying into timestamp"
            );
        }

        value
    }
}

impl Default for MonotonicEntropy {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe free list of interchangeable entropy sources.
///
/// Sources are created lazily on a miss and never torn down.
#[derive(Debug, Default)]
pub struct EntropyPool {
    idle: Mutex<Vec<MonotonicEntropy>>,
}

impl EntropyPool {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Returns the process-wide pool used by [`crate::generate`].
    #[must_use]
    pub fn global() -> &'static EntropyPool {
        &GLOBAL_POOL
    }

    /// Takes an idle source, or seeds a new one if none is available.
    ///
    /// The returned source is exclusively owned until it is released.
    #[must_use]
    pub fn acquire(&self) -> MonotonicEntropy {
        let popped = self.lock().pop();
        popped.unwrap_or_else(|| {
            trace!("entropy pool empty, seeding new source");
            MonotonicEntropy::new()
        })
    }

    /// Returns a source to the pool for later reuse.
    pub fn release(&self, source: MonotonicEntropy) {
        self.lock().push(source);
    }

    /// Runs `f` with a pooled source and releases it afterwards.
    pub fn with<R>(&self, f: impl FnOnce(&mut MonotonicEntropy) -> R) -> R {
        let mut source = self.acquire();
        let result = f(&mut source);
        self.release(source);
        result
    }

    /// Returns the number of idle sources.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    // Only push and pop run under the lock, so a poisoned list is still intact.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MonotonicEntropy>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_millisecond_is_strictly_increasing() {
        let mut source = MonotonicEntropy::with_seed(7, 0);
        let mut previous = source.next(1_000);
        for _ in 0..1_000 {
            let next = source.next(1_000);
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_increment_is_bounded() {
        let mut source = MonotonicEntropy::with_seed(42, 10);
        let first = source.next(5);
        let second = source.next(5);
        let delta = second.0 - first.0;
        assert!((1..=10).contains(&delta), "delta {delta} out of bounds");
    }

    #[test]
    fn test_zero_increment_means_u32_max() {
        let source = MonotonicEntropy::with_seed(1, 0);
        assert_eq!(source.increment_bound(), u64::from(u32::MAX));
    }

    #[test]
    fn test_new_millisecond_keeps_timestamp() {
        let mut source = MonotonicEntropy::with_seed(3, 0);
        assert_eq!(source.next(10).timestamp_ms(), 10);
        assert_eq!(source.next(11).timestamp_ms(), 11);
        // A clock step backwards is honoured, not clamped.
        assert_eq!(source.next(9).timestamp_ms(), 9);
    }

    #[test]
    fn test_random_field_carries_into_timestamp() {
        let mut source = MonotonicEntropy::with_seed(9, 1);
        source.last = Some(Last {
            clock_ms: 100,
            value: Ulid::from_parts(100, MAX_RANDOM).0,
        });

        let next = source.next(100);
        assert_eq!(next.timestamp_ms(), 101);
        assert_eq!(next.random(), 0);
    }

    #[test]
    fn test_timestamp_is_masked() {
        let mut source = MonotonicEntropy::with_seed(1, 0);
        assert_eq!(source.next(u64::MAX).timestamp_ms(), MAX_TIMESTAMP_MS);
    }

    #[test]
    fn test_seeded_sources_are_deterministic() {
        let mut a = MonotonicEntropy::with_seed(11, 0);
        let mut b = MonotonicEntropy::with_seed(11, 0);
        assert_eq!(a.next(1), b.next(1));
        assert_eq!(a.next(1), b.next(1));
    }

    #[test]
    fn test_wall_clock_sources_diverge() {
        let mut a = MonotonicEntropy::new();
        let mut b = MonotonicEntropy::new();
        assert_ne!(a.next(1), b.next(1));
    }

    #[test]
    fn test_pool_reuses_released_source() {
        let pool = EntropyPool::new();
        assert_eq!(pool.idle(), 0);

        let first = pool.with(|source| source.next(50));
        assert_eq!(pool.idle(), 1);

        // The same instance continues its monotonic run.
        let second = pool.with(|source| source.next(50));
        assert_eq!(pool.idle(), 1);
        assert!(second > first);
    }

    #[test]
    fn test_pool_hands_out_distinct_sources() {
        let pool = EntropyPool::new();
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.idle(), 0);

        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle(), 2);
    }
}
