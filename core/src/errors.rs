//! Error types for breaker and debounce operations

use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a guarded call
///
/// A caller can always tell a short-circuit apart from a real upstream
/// failure: `Open` means no downstream work happened at all.
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// Circuit is open, the protected call was not invoked
    #[error("circuit '{circuit}' is open: service unreachable (retry in {retry_after:?})")]
    Open {
        circuit: String,
        /// Consecutive failures recorded when the call was rejected
        failures: u32,
        /// Remaining time until a trial call will be permitted
        retry_after: Duration,
    },
    /// The protected call ran and failed; its error is passed through as-is
    #[error(transparent)]
    Execution(E),
}

impl<E> CircuitError<E> {
    /// True when the call was short-circuited
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    /// True when the protected call itself failed
    pub fn is_execution(&self) -> bool {
        matches!(self, CircuitError::Execution(_))
    }

    /// Extract the upstream error, if the protected call produced one
    pub fn into_execution(self) -> Option<E> {
        match self {
            CircuitError::Execution(e) => Some(e),
            CircuitError::Open { .. } => None,
        }
    }

    /// Time until a trial is permitted, for short-circuited calls
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CircuitError::Open { retry_after, .. } => Some(*retry_after),
            CircuitError::Execution(_) => None,
        }
    }
}

impl CircuitError<Infallible> {
    /// Widen a rejection from [`Breaker::try_acquire`](crate::Breaker::try_acquire)
    /// into the error type of a concrete guarded call
    pub fn widen<E>(self) -> CircuitError<E> {
        match self {
            CircuitError::Open {
                circuit,
                failures,
                retry_after,
            } => CircuitError::Open {
                circuit,
                failures,
                retry_after,
            },
            CircuitError::Execution(never) => match never {},
        }
    }
}

/// Invalid construction parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("base timeout must be greater than zero")]
    ZeroBaseTimeout,

    #[error("debounce window must be greater than zero")]
    ZeroWindow,

    #[error("jitter factor must be within 0.0..=1.0, got {0}")]
    InvalidJitter(f64),

    #[error("max backoff {max_backoff:?} is below base timeout {base_timeout:?}")]
    MaxBackoffBelowBase {
        max_backoff: Duration,
        base_timeout: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::fmt;

    #[derive(Debug)]
    struct UpstreamError;

    impl fmt::Display for UpstreamError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("upstream timed out")
        }
    }

    impl std::error::Error for UpstreamError {}

    #[test]
    fn test_execution_error_is_transparent() {
        let err: CircuitError<UpstreamError> = CircuitError::Execution(UpstreamError);

        assert_eq!(err.to_string(), "upstream timed out");
        assert!(err.is_execution());
        assert!(!err.is_open());
        assert!(err.retry_after().is_none());
        assert!(err.into_execution().is_some());
    }

    #[test]
    fn test_open_error_message() {
        let err: CircuitError<UpstreamError> = CircuitError::Open {
            circuit: "payments".to_string(),
            failures: 4,
            retry_after: Duration::from_millis(1500),
        };

        let msg = err.to_string();
        assert!(msg.contains("payments"));
        assert!(msg.contains("service unreachable"));
        assert!(err.is_open());
        assert!(err.source().is_none());
        assert_eq!(err.retry_after(), Some(Duration::from_millis(1500)));
        assert!(err.into_execution().is_none());
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::InvalidJitter(1.5).to_string(),
            "jitter factor must be within 0.0..=1.0, got 1.5"
        );
        assert_eq!(
            ConfigError::ZeroBaseTimeout.to_string(),
            "base timeout must be greater than zero"
        );
    }
}
