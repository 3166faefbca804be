//! Time-windowed result cache
//!
//! A [`Debounce`] remembers the last outcome of its protected operation and
//! serves it, success or failure alike, until a cool-down window has passed.

use crate::{
    backoff::saturating_millis,
    clock::{Clock, MonotonicClock},
    errors::ConfigError,
    protected::ProtectedCall,
};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

struct Slot<T, E> {
    outcome: Option<Result<T, E>>,
    /// Cached outcome is served while the clock reads before this
    deadline: Duration,
}

/// Debounced wrapper with the same call shape as the protected operation
///
/// The slot lock is held while the protected operation runs, so callers
/// arriving during a refresh wait for it and share its outcome.
pub struct Debounce<F, C: ?Sized = ()>
where
    F: ProtectedCall<C>,
{
    protected: F,
    window: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Slot<F::Output, F::Error>>,
    _context: PhantomData<fn(&C)>,
}

impl<F, C> Debounce<F, C>
where
    C: ?Sized,
    F: ProtectedCall<C>,
{
    /// Wrap `protected`, caching each outcome for `window`
    pub fn new(protected: F, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(protected, window, Arc::new(MonotonicClock::new()))
    }

    /// Like [`Debounce::new`] with a custom time source
    pub fn with_clock(
        protected: F,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }

        Ok(Self {
            protected,
            window,
            clock,
            slot: Mutex::new(Slot {
                outcome: None,
                deadline: Duration::ZERO,
            }),
            _context: PhantomData,
        })
    }

    /// Return the cached outcome, or refresh it if the window has passed
    pub fn call(&self, ctx: &C) -> Result<F::Output, F::Error>
    where
        F::Output: Clone,
        F::Error: Clone,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(outcome) = &slot.outcome
            && self.clock.now() < slot.deadline
        {
            return outcome.clone();
        }

        debug!(window_ms = saturating_millis(self.window), "refreshing debounced value");
        let outcome = self.protected.invoke(ctx);
        slot.deadline = self.clock.now().saturating_add(self.window);
        slot.outcome = Some(outcome.clone());
        outcome
    }

    /// Drop the cached outcome so the next call refreshes
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.outcome = None;
    }

    /// Check if a call right now would be served from the cache
    pub fn is_fresh(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.outcome.is_some() && self.clock.now() < slot.deadline
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<F, C> std::fmt::Debug for Debounce<F, C>
where
    C: ?Sized,
    F: ProtectedCall<C>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounce")
            .field("window", &self.window)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(calls: Arc<AtomicUsize>) -> impl Fn(&()) -> Result<usize, String> {
        move |_ctx: &()| Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[test]
    fn test_first_call_invokes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debounce = Debounce::new(counting(calls.clone()), Duration::from_secs(1)).unwrap();

        assert!(!debounce.is_fresh());
        assert_eq!(debounce.call(&()), Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_serves_cached_value_within_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::new());
        let debounce =
            Debounce::with_clock(counting(calls.clone()), Duration::from_secs(1), clock.clone())
                .unwrap();

        assert_eq!(debounce.call(&()), Ok(1));
        for _ in 0..3 {
            clock.advance(Duration::from_millis(300));
            assert_eq!(debounce.call(&()), Ok(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(100));
        assert!(!debounce.is_fresh());
        assert_eq!(debounce.call(&()), Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failures_are_cached_too() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let clock = Arc::new(ManualClock::new());
        let debounce = Debounce::with_clock(
            move |_ctx: &()| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>("upstream down".to_string())
            },
            Duration::from_secs(5),
            clock.clone(),
        )
        .unwrap();

        assert_eq!(debounce.call(&()), Err("upstream down".to_string()));
        clock.advance(Duration::from_secs(1));
        assert_eq!(debounce.call(&()), Err("upstream down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalidate_forces_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let debounce = Debounce::new(counting(calls.clone()), Duration::from_secs(60)).unwrap();

        assert_eq!(debounce.call(&()), Ok(1));
        assert!(debounce.is_fresh());

        debounce.invalidate();
        assert!(!debounce.is_fresh());
        assert_eq!(debounce.call(&()), Ok(2));
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = Debounce::<_, ()>::new(|_ctx: &()| Ok::<_, String>(()), Duration::ZERO);
        assert!(matches!(result, Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn test_concurrent_callers_share_one_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let debounce = Debounce::new(
            move |_ctx: &()| {
                std::thread::sleep(Duration::from_millis(20));
                Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst))
            },
            Duration::from_secs(60),
        )
        .unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| assert_eq!(debounce.call(&()), Ok(0)));
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
