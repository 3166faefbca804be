//! backoff-breaker - circuit breaker with exponential backoff
//!
//! This crate wraps a fallible, potentially slow operation into a drop-in
//! replacement with the same call shape that adds fault tolerance:
//! - [`Breaker`]: counts consecutive failures and, once a threshold is
//!   reached, short-circuits calls for a backoff window that doubles with
//!   every further failure
//! - [`Debounce`]: serves the last outcome for a fixed cool-down window
//!   instead of invoking the operation again
//!
//! Both wrap any `Fn(&C) -> Result<T, E>`, where `C` is the caller's
//! execution context. The breaker also wraps async operations.
//!
//! # Example
//!
//! ```rust
//! use backoff_breaker::{Breaker, CircuitError};
//! use std::time::Duration;
//!
//! let breaker = Breaker::builder("inventory")
//!     .failure_threshold(3)
//!     .base_timeout(Duration::from_secs(1))
//!     .on_open(|name| eprintln!("circuit {} opened", name))
//!     .build(|sku: &str| {
//!         // Your service call here
//!         Err::<u32, _>(format!("{} lookup timed out", sku))
//!     })
//!     .unwrap();
//!
//! for _ in 0..3 {
//!     assert!(matches!(breaker.call("sku-1"), Err(CircuitError::Execution(_))));
//! }
//!
//! // Threshold reached: fail fast without touching the service
//! assert!(matches!(breaker.call("sku-1"), Err(CircuitError::Open { .. })));
//! ```

pub mod backoff;
pub mod breaker;
pub mod builder;
pub mod callbacks;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod errors;
pub mod protected;

pub use breaker::{Breaker, Permit};
pub use builder::BreakerBuilder;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Config;
pub use debounce::Debounce;
pub use errors::{CircuitError, ConfigError};
pub use protected::{AsyncProtectedCall, ProtectedCall};

use std::time::Duration;

/// Breaker state, derived from the failure count and the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Failure threshold not reached; every call goes through
    Closed,
    /// Backoff window in force; calls are short-circuited
    Open,
    /// Backoff window elapsed; the next call is a trial
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    /// Clock reading of the most recent attempt
    pub last_attempt_at: Duration,
    /// Time left in the backoff window, None when calls would go through
    pub retry_after: Option<Duration>,
}
