//! Circuit breaker with exponential backoff
//!
//! The breaker keeps two pieces of mutable state: the number of consecutive
//! failures and the time of the last attempt. Once the failure count reaches
//! the threshold, every further attempt has to wait
//! `base_timeout * 2^(failure_count - failure_threshold)` after the previous
//! one. A single success resets the count.

use crate::{
    BreakerSnapshot, CircuitState,
    backoff::{backoff_delay, saturating_millis},
    builder::BreakerBuilder,
    callbacks::Callbacks,
    clock::Clock,
    config::Config,
    errors::{CircuitError, ConfigError},
    protected::{AsyncProtectedCall, ProtectedCall},
};
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{info, trace, warn};

/// Mutable breaker state, only touched through the breaker's lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BreakerState {
    pub failure_count: u32,
    /// Clock reading of the most recent attempt (or of construction)
    pub last_attempt_at: Duration,
    /// Delay in force while the threshold is reached, sampled once per failure
    pub backoff: Duration,
}

impl BreakerState {
    fn new(config: &Config, now: Duration) -> Self {
        let mut state = Self {
            failure_count: 0,
            last_attempt_at: now,
            backoff: Duration::ZERO,
        };
        state.settle(config);
        state
    }

    /// Recompute the backoff delay after `failure_count` changed
    fn settle(&mut self, config: &Config) {
        self.backoff = match self.failure_count.checked_sub(config.failure_threshold) {
            Some(overflow) => backoff_delay(config, overflow),
            None => Duration::ZERO,
        };
    }

    fn threshold_reached(&self, config: &Config) -> bool {
        self.failure_count >= config.failure_threshold
    }

    /// Earliest time a new attempt is allowed, if backoff is engaged
    fn retry_at(&self, config: &Config) -> Option<Duration> {
        self.threshold_reached(config)
            .then(|| self.last_attempt_at.saturating_add(self.backoff))
    }

    fn circuit_state(&self, config: &Config, now: Duration) -> CircuitState {
        match self.retry_at(config) {
            None => CircuitState::Closed,
            Some(retry_at) if now <= retry_at => CircuitState::Open,
            Some(_) => CircuitState::HalfOpen,
        }
    }
}

/// Proof that a call passed the short-circuit check
///
/// Hand it back through [`Breaker::record_success`] or
/// [`Breaker::record_failure`] once the protected operation returned.
/// Dropping it records nothing. A permit is only accepted by the breaker
/// that issued it; handing it to another breaker records nothing either.
#[derive(Debug)]
#[must_use = "a permit must be settled with record_success or record_failure"]
pub struct Permit {
    breaker_id: u64,
    trial: bool,
}

impl Permit {
    /// True when this attempt is a half-open trial
    pub fn is_trial(&self) -> bool {
        self.trial
    }
}

/// Circuit breaker public API
///
/// Wraps one protected operation `F`. The breaker is `Sync` whenever `F` is,
/// so it can be shared through an `Arc` and called from many threads or
/// tasks at once. The state lock is held only while checking and while
/// recording, never while the protected operation runs.
///
/// Several callers can pass the half-open check together and all run the
/// protected operation; there is no single-trial enforcement.
pub struct Breaker<F> {
    id: u64,
    name: String,
    protected: F,
    config: Config,
    state: RwLock<BreakerState>,
    clock: Arc<dyn Clock>,
    callbacks: Callbacks,
}

impl Breaker<()> {
    /// Create a new breaker builder; the protected operation is supplied to
    /// [`BreakerBuilder::build`]
    pub fn builder(name: impl Into<String>) -> BreakerBuilder {
        BreakerBuilder::new(name)
    }
}

impl<F> Breaker<F> {
    /// Create a breaker with the given threshold and base timeout
    ///
    /// Use [`Breaker::builder`] for backoff caps, jitter, callbacks, or a
    /// custom clock.
    pub fn new(
        name: impl Into<String>,
        protected: F,
        failure_threshold: u32,
        base_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        BreakerBuilder::new(name)
            .failure_threshold(failure_threshold)
            .base_timeout(base_timeout)
            .build(protected)
    }

    /// Assemble a breaker from validated parts (used by builder)
    pub(crate) fn from_parts(
        name: String,
        protected: F,
        config: Config,
        clock: Arc<dyn Clock>,
        callbacks: Callbacks,
    ) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        let state = BreakerState::new(&config, clock.now());

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name,
            protected,
            config,
            state: RwLock::new(state),
            clock,
            callbacks,
        }
    }

    /// Execute the protected operation with breaker protection
    ///
    /// Returns `CircuitError::Open` without running the operation while the
    /// backoff window is in force, and `CircuitError::Execution` carrying the
    /// operation's own error when it ran and failed.
    pub fn call<C>(
        &self,
        ctx: &C,
    ) -> Result<<F as ProtectedCall<C>>::Output, CircuitError<<F as ProtectedCall<C>>::Error>>
    where
        C: ?Sized,
        F: ProtectedCall<C>,
    {
        let permit = self.try_acquire().map_err(CircuitError::widen)?;

        match self.protected.invoke(ctx) {
            Ok(value) => {
                self.record_success(permit);
                Ok(value)
            }
            Err(e) => {
                self.record_failure(permit);
                Err(CircuitError::Execution(e))
            }
        }
    }

    /// Async variant of [`Breaker::call`]
    ///
    /// No lock is held across the `.await`. If the returned future is dropped
    /// before the operation completes, the attempt is not recorded.
    pub async fn call_async<C>(
        &self,
        ctx: &C,
    ) -> Result<
        <F as AsyncProtectedCall<C>>::Output,
        CircuitError<<F as AsyncProtectedCall<C>>::Error>,
    >
    where
        C: ?Sized,
        F: AsyncProtectedCall<C>,
    {
        let permit = self.try_acquire().map_err(CircuitError::widen)?;

        match self.protected.invoke_async(ctx).await {
            Ok(value) => {
                self.record_success(permit);
                Ok(value)
            }
            Err(e) => {
                self.record_failure(permit);
                Err(CircuitError::Execution(e))
            }
        }
    }

    /// Decide whether an attempt may go ahead
    ///
    /// Takes only the read lock, so concurrent checks do not block each
    /// other. A rejection leaves the state untouched.
    pub fn try_acquire(&self) -> Result<Permit, CircuitError<Infallible>> {
        let (failures, retry_at, now) = {
            let state = self.read_state();
            let now = self.clock.now();
            (state.failure_count, state.retry_at(&self.config), now)
        };

        let Some(retry_at) = retry_at else {
            return Ok(self.permit(false));
        };

        if now <= retry_at {
            let retry_after = retry_at - now;
            trace!(
                circuit = %self.name,
                failures,
                retry_after_ms = saturating_millis(retry_after),
                "short-circuiting call"
            );
            self.callbacks.trigger_reject(&self.name);
            return Err(CircuitError::Open {
                circuit: self.name.clone(),
                failures,
                retry_after,
            });
        }

        info!(circuit = %self.name, failures, "backoff elapsed, permitting trial call");
        self.callbacks.trigger_half_open(&self.name);
        Ok(self.permit(true))
    }

    fn permit(&self, trial: bool) -> Permit {
        Permit {
            breaker_id: self.id,
            trial,
        }
    }

    /// Check that `permit` was issued here; foreign permits are ignored
    fn accepts(&self, permit: &Permit) -> bool {
        if permit.breaker_id == self.id {
            return true;
        }
        warn!(circuit = %self.name, "ignoring permit issued by another breaker");
        false
    }

    /// Record a successful attempt: reset the failure count
    pub fn record_success(&self, permit: Permit) {
        if !self.accepts(&permit) {
            return;
        }

        let previous_failures = {
            let mut state = self.write_state();
            let now = self.clock.now();
            let previous = state.failure_count;
            state.last_attempt_at = now;
            state.failure_count = 0;
            state.settle(&self.config);
            previous
        };

        let recovered = previous_failures > 0 && previous_failures >= self.config.failure_threshold;
        if recovered {
            info!(
                circuit = %self.name,
                previous_failures,
                trial = permit.trial,
                "circuit closed"
            );
            self.callbacks.trigger_close(&self.name);
        }
    }

    /// Record a failed attempt: bump the failure count and extend the backoff
    pub fn record_failure(&self, permit: Permit) {
        if !self.accepts(&permit) {
            return;
        }

        let (failures, opened, backoff) = {
            let mut state = self.write_state();
            let now = self.clock.now();
            state.last_attempt_at = now;
            state.failure_count = state.failure_count.saturating_add(1);
            state.settle(&self.config);
            (
                state.failure_count,
                state.threshold_reached(&self.config),
                state.backoff,
            )
        };

        if opened {
            warn!(
                circuit = %self.name,
                failures,
                trial = permit.trial,
                retry_after_ms = saturating_millis(backoff),
                "circuit open"
            );
            self.callbacks.trigger_open(&self.name);
        }
    }

    /// Current state, derived from the failure count and the clock
    pub fn state(&self) -> CircuitState {
        let state = self.read_state();
        state.circuit_state(&self.config, self.clock.now())
    }

    /// Consistent view of the breaker for metrics and health endpoints
    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = *self.read_state();
        let now = self.clock.now();

        BreakerSnapshot {
            state: state.circuit_state(&self.config, now),
            failure_count: state.failure_count,
            last_attempt_at: state.last_attempt_at,
            retry_after: state
                .retry_at(&self.config)
                .and_then(|retry_at| retry_at.checked_sub(now)),
        }
    }

    /// Consecutive failures since the last success
    pub fn failure_count(&self) -> u32 {
        self.read_state().failure_count
    }

    /// Check if calls are currently being short-circuited
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Check if the failure threshold has not been reached
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Forget all failures, as if the breaker had just been built
    pub fn reset(&self) {
        let mut state = self.write_state();
        *state = BreakerState::new(&self.config, self.clock.now());
        drop(state);
        info!(circuit = %self.name, "circuit reset");
    }

    // The state block is plain data that is consistent between statements,
    // so a poisoned lock is still safe to use.

    fn read_state(&self) -> RwLockReadGuard<'_, BreakerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, BreakerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F> std::fmt::Debug for Breaker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Breaker")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &*self.read_state())
            .field("clock", &self.clock)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
