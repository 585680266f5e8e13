//! Timing Primitives
//!
//! A `Clock` reports the time elapsed since an arbitrary origin. The
//! `MonotonicClock` is backed by `std::time::Instant`; the `ManualClock` only
//! moves when told to, which makes calibration and invoker timing
//! deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering, compiler_fence};
use std::time::Duration;

/// Source of timestamps for the invocation engine
pub trait Clock: Send + Sync {
    /// Time elapsed since this clock's origin
    fn now(&self) -> Duration;
}

// ─── Monotonic clock ─────────────────────────────────────────────────────────

/// Steady wall clock
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

impl MonotonicClock {
    /// Start a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ─── Manual clock ────────────────────────────────────────────────────────────

/// Clock that only advances on request
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `d`
    pub fn advance(&self, d: Duration) {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

// ─── Stop watch ──────────────────────────────────────────────────────────────

/// Records lap timestamps and yields the durations between them
pub struct StopWatch<'a> {
    clock: &'a dyn Clock,
    laps: Vec<Duration>,
}

impl<'a> StopWatch<'a> {
    /// Take the first timestamp, reserving room for `laps` more
    #[inline]
    pub fn start(clock: &'a dyn Clock, laps: usize) -> Self {
        let mut timestamps = Vec::with_capacity(laps + 1);
        timestamps.push(clock.now());
        Self {
            clock,
            laps: timestamps,
        }
    }

    /// Take a timestamp
    #[inline(always)]
    pub fn lap(&mut self) {
        self.laps.push(self.clock.now());
    }

    /// Durations between consecutive timestamps
    pub fn durations(&self) -> Vec<Duration> {
        self.laps
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]))
            .collect()
    }
}

/// Compiler-only memory fence around the timed region
///
/// Keeps the compiler from moving workload code across a timestamp without
/// emitting a hardware fence.
#[inline(always)]
pub fn ordering_fence() {
    compiler_fence(Ordering::AcqRel);
}
