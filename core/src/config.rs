//! Breaker tuning parameters

use crate::errors::ConfigError;
use std::time::Duration;

/// Circuit breaker configuration
///
/// Fixed for the lifetime of a breaker. With the `serde` feature enabled,
/// durations are read and written as humantime strings (`"1s"`, `"250ms"`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Config {
    /// Consecutive failures tolerated before backoff engages
    pub failure_threshold: u32,

    /// Unit backoff delay; doubled for every failure past the threshold
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub base_timeout: Duration,

    /// Upper bound on the backoff delay. If None, the delay only saturates
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub max_backoff: Option<Duration>,

    /// Jitter factor for the backoff delay (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: delay * (1 - jitter + rand * jitter)
    pub jitter_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            base_timeout: Duration::from_secs(1),
            max_backoff: None,
            jitter_factor: 0.0,
        }
    }
}

impl Config {
    /// Check the invariants a breaker relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_timeout.is_zero() {
            return Err(ConfigError::ZeroBaseTimeout);
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitter(self.jitter_factor));
        }

        if let Some(max_backoff) = self.max_backoff
            && max_backoff < self.base_timeout
        {
            return Err(ConfigError::MaxBackoffBelowBase {
                max_backoff,
                base_timeout: self.base_timeout,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();

        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.base_timeout, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_base_timeout_rejected() {
        let config = Config {
            base_timeout: Duration::ZERO,
            ..Default::default()
        };

        assert_eq!(config.validate(), Err(ConfigError::ZeroBaseTimeout));
    }

    #[test]
    fn test_zero_threshold_allowed() {
        let config = Config {
            failure_threshold: 0,
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_jitter_out_of_range_rejected() {
        for jitter in [-0.1, 1.01, f64::NAN] {
            let config = Config {
                jitter_factor: jitter,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidJitter(_))),
                "jitter {} should be rejected",
                jitter
            );
        }
    }

    #[test]
    fn test_max_backoff_below_base_rejected() {
        let config = Config {
            base_timeout: Duration::from_secs(2),
            max_backoff: Some(Duration::from_secs(1)),
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::MaxBackoffBelowBase {
                max_backoff: Duration::from_secs(1),
                base_timeout: Duration::from_secs(2),
            })
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_from_json() {
        let config: Config = serde_json::from_str(
            r#"{ "failure_threshold": 5, "base_timeout": "250ms", "max_backoff": "1m" }"#,
        )
        .expect("valid config");

        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.base_timeout, Duration::from_millis(250));
        assert_eq!(config.max_backoff, Some(Duration::from_secs(60)));
        assert_eq!(config.jitter_factor, 0.0);
    }
}
