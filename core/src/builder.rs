//! Builder API for ergonomic breaker configuration

use crate::{
    breaker::Breaker,
    callbacks::Callbacks,
    clock::{Clock, MonotonicClock},
    config::Config,
    errors::ConfigError,
};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating breakers with fluent API
pub struct BreakerBuilder {
    name: String,
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    callbacks: Callbacks,
}

impl BreakerBuilder {
    /// Create a new builder for a breaker with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            clock: None,
            callbacks: Callbacks::new(),
        }
    }

    /// Replace the whole configuration, e.g. one loaded from a config file
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the number of consecutive failures tolerated before backoff engages
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Set the unit backoff delay
    pub fn base_timeout(mut self, timeout: Duration) -> Self {
        self.config.base_timeout = timeout;
        self
    }

    /// Cap the backoff delay
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.config.max_backoff = Some(max_backoff);
        self
    }

    /// Set the jitter factor (0.0 = no jitter, 1.0 = full jitter)
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.config.jitter_factor = factor;
        self
    }

    /// Use a custom time source instead of the real monotonic clock
    ///
    /// # Examples
    ///
    /// ```rust
    /// use backoff_breaker::{Breaker, ManualClock};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let clock = Arc::new(ManualClock::new());
    /// let breaker = Breaker::builder("api")
    ///     .failure_threshold(1)
    ///     .clock(clock.clone())
    ///     .build(|_ctx: &()| Err::<(), _>("down"))
    ///     .unwrap();
    ///
    /// let _ = breaker.call(&());
    /// assert!(breaker.is_open());
    ///
    /// clock.advance(Duration::from_secs(2));
    /// assert!(!breaker.is_open());
    /// ```
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set callback for when the breaker starts short-circuiting
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Set callback for when a success resets an open breaker
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Set callback for when a trial call is let through
    pub fn on_half_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_half_open = Some(Arc::new(f));
        self
    }

    /// Set callback for every short-circuited call
    pub fn on_reject<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_reject = Some(Arc::new(f));
        self
    }

    /// Build the breaker around the protected operation
    pub fn build<F>(self, protected: F) -> Result<Breaker<F>, ConfigError> {
        self.config.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        Ok(Breaker::from_parts(
            self.name,
            protected,
            self.config,
            clock,
            self.callbacks,
        ))
    }
}

impl std::fmt::Debug for BreakerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_ctx: &()) -> Result<(), String> {
        Ok(())
    }

    #[test]
    fn test_builder_defaults() {
        let breaker = BreakerBuilder::new("test").build(ok).unwrap();

        assert_eq!(breaker.state().as_str(), "Closed");
        assert_eq!(breaker.config(), &Config::default());
    }

    #[test]
    fn test_builder_custom_config() {
        let breaker = BreakerBuilder::new("test")
            .failure_threshold(10)
            .base_timeout(Duration::from_millis(250))
            .max_backoff(Duration::from_secs(30))
            .jitter_factor(0.2)
            .build(ok)
            .unwrap();

        let config = breaker.config();
        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.base_timeout, Duration::from_millis(250));
        assert_eq!(config.max_backoff, Some(Duration::from_secs(30)));
        assert_eq!(config.jitter_factor, 0.2);
    }

    #[test]
    fn test_builder_whole_config() {
        let config = Config {
            failure_threshold: 7,
            ..Default::default()
        };

        let breaker = BreakerBuilder::new("test")
            .config(config.clone())
            .build(ok)
            .unwrap();

        assert_eq!(breaker.config(), &config);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = BreakerBuilder::new("test")
            .base_timeout(Duration::ZERO)
            .build(ok);
        assert!(matches!(result, Err(ConfigError::ZeroBaseTimeout)));

        let result = BreakerBuilder::new("test").jitter_factor(2.0).build(ok);
        assert!(matches!(result, Err(ConfigError::InvalidJitter(_))));
    }

    #[test]
    fn test_builder_with_callbacks() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let opened = Arc::new(AtomicBool::new(false));
        let opened_clone = opened.clone();

        let breaker = BreakerBuilder::new("test")
            .failure_threshold(2)
            .on_open(move |_name| {
                opened_clone.store(true, Ordering::SeqCst);
            })
            .build(|_ctx: &()| Err::<(), _>("error"))
            .unwrap();

        let _ = breaker.call(&());
        assert!(!opened.load(Ordering::SeqCst));

        let _ = breaker.call(&());
        assert!(opened.load(Ordering::SeqCst));
    }
}
