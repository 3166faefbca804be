//! Exponential backoff delay computation

use crate::config::Config;
use std::time::Duration;

/// Delay enforced after the breaker has seen `overflow` failures past its threshold
///
/// `overflow` is `failure_count - failure_threshold` and is only meaningful
/// once the threshold has been reached (overflow 0 waits one `base_timeout`).
/// The exact delay is `base_timeout * 2^overflow`, saturating at
/// `Duration::MAX`, then capped by `max_backoff` and jittered.
pub fn backoff_delay(config: &Config, overflow: u32) -> Duration {
    let exact = 2u32
        .checked_pow(overflow)
        .and_then(|factor| config.base_timeout.checked_mul(factor))
        .unwrap_or(Duration::MAX);

    let capped = match config.max_backoff {
        Some(max_backoff) => exact.min(max_backoff),
        None => exact,
    };

    apply_jitter(capped, config.jitter_factor)
}

/// Whole milliseconds in `delay`, saturating at `u64::MAX` for log fields
pub(crate) fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Shrink a delay by a random share of up to `jitter_factor`
///
/// The policy only scales its base, so it is fed nanoseconds to keep
/// sub-millisecond delays intact. Delays beyond `u64::MAX` nanoseconds
/// (about 584 years) are clamped there before jittering.
fn apply_jitter(delay: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 {
        return delay;
    }

    let delay_ns = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
    let policy = chrono_machines::Policy {
        max_attempts: 1,
        base_delay_ms: delay_ns,
        multiplier: 1.0,
        max_delay_ms: delay_ns,
    };
    Duration::from_nanos(policy.calculate_delay(1, jitter_factor))
}
