//! Monotonic clock (C1).

use {
    parking_lot::Mutex,
    std::sync::atomic::{AtomicI64, Ordering},
};

/// Sentinel for "never touched".
pub const TIMESTAMP_NIL: i64 = -1;

/// Strictly non-decreasing nanosecond clock (C1).
///
/// Wraps a wall-clock nanosecond source and enforces strict monotonicity:
/// if two calls would otherwise read the same nanosecond, the second one
/// is bumped by one unit. This makes ELRU key comparisons deterministic
/// under concurrent `touch` calls that land in the same nanosecond.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    /// Creates a new clock with no prior readings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Returns a timestamp strictly greater than every previous call.
    pub fn now(&self) -> i64 {
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let wall = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(prev);
            let candidate = if wall > prev { wall } else { prev + 1 };
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(observed) => prev = observed,
            }
        }
    }
}

/// Deterministic clock for tests: advances by one unit per call, starting
/// from an arbitrary seed. Lets test scenarios refer to `t1 < t2 < ...`
/// without depending on wall-clock granularity.
#[derive(Debug)]
pub struct SteppedClock {
    next: Mutex<i64>,
}

impl SteppedClock {
    /// Creates a clock whose first call returns `seed`.
    #[must_use]
    pub const fn new(seed: i64) -> Self {
        Self {
            next: Mutex::new(seed),
        }
    }
}

impl Default for SteppedClock {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Abstraction over time sources so the engine can be driven by either the
/// wall-clock [`MonotonicClock`] or a [`SteppedClock`] in tests.
pub trait Clock: Send + Sync {
    /// Returns a timestamp strictly greater than every previous call.
    fn now(&self) -> i64;
}

impl Clock for MonotonicClock {
    fn now(&self) -> i64 {
        MonotonicClock::now(self)
    }
}

impl Clock for SteppedClock {
    fn now(&self) -> i64 {
        let mut next = self.next.lock();
        let value = *next;
        *next += 1;
        value
    }
}
