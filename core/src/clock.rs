//! Time sources for breaker and debounce bookkeeping
//!
//! This module provides different clock implementations:
//! - `MonotonicClock`: real monotonic time anchored at creation
//! - `ManualClock`: time that only moves when told to, for tests and simulations

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Abstract monotonic time source
///
/// Readings are offsets from an arbitrary anchor, so they are immune to
/// wall-clock adjustments (NTP, DST) and only ever compared with each other.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Time elapsed since the clock's anchor
    fn now(&self) -> Duration;
}

/// Real monotonic clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    /// Monotonic time anchor
    start_time: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Manually driven clock
///
/// Starts at zero and advances only through [`ManualClock::advance`] or
/// [`ManualClock::set`]. Share it with a breaker through an `Arc` to step
/// through backoff windows without sleeping.
///
/// # Example
///
/// ```rust
/// use backoff_breaker::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_secs(2));
/// assert_eq!(clock.now(), Duration::from_secs(2));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(by))
            });
    }

    /// Jump to an absolute reading; going backwards is allowed for tests only
    pub fn set(&self, to: Duration) {
        let to = u64::try_from(to.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.store(to, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
