//! Retry policy for establishing the initial connection (login) and for
//! reopening a subscription's WebSocket after it drops. Ordinary RWS request
//! methods (`get`/`set` on an I/O signal, a file transfer, ...) are never
//! retried automatically: a mid-motion command retried twice is a different
//! kind of bug than a dropped connection, and the caller is in a better
//! position to decide whether to resend it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Generates a sequence of geometrically increasing delays, capped at a
/// maximum, and exhausted after a fixed number of attempts.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
    attempts_left: u32,
}

impl ExponentialBackoff {
    /// `initial` is the first retry's delay; each subsequent delay is
    /// `multiplier` times the previous, capped at `max`. Returns `None` from
    /// [`ExponentialBackoff::next`] after `max_attempts` delays.
    pub fn new(initial: Duration, max: Duration, multiplier: f64, max_attempts: u32) -> Self {
        Self {
            current: initial,
            max,
            multiplier,
            attempts_left: max_attempts,
        }
    }

    /// The next delay, or `None` if the attempt budget is exhausted.
    pub fn next(&mut self) -> Option<Duration> {
        if self.attempts_left == 0 {
            return None;
        }
        self.attempts_left -= 1;
        let delay = self.current;
        let scaled = self.current.as_secs_f64() * self.multiplier;
        self.current = Duration::from_secs_f64(scaled).min(self.max);
        Some(delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30), 2.0, 5)
    }
}

/// Decides whether a failed connection attempt should be retried.
pub trait RequestRetryPolicy {
    /// Return the delay before the next attempt, or `None` to give up.
    fn next_delay(&mut self) -> Option<Duration>;
}

impl RequestRetryPolicy for Box<dyn RequestRetryPolicy + Send> {
    fn next_delay(&mut self) -> Option<Duration> {
        (**self).next_delay()
    }
}

/// Retries on an [`ExponentialBackoff`] schedule, unconditionally (the
/// connection errors this policy governs are all of the same kind: "could
/// not reach or authenticate with the controller").
#[derive(Debug, Clone)]
pub struct DefaultRetryPolicy {
    backoff: ExponentialBackoff,
}

impl DefaultRetryPolicy {
    pub fn new(backoff: ExponentialBackoff) -> Self {
        Self { backoff }
    }
}

impl Default for DefaultRetryPolicy {
    fn default() -> Self {
        Self::new(ExponentialBackoff::default())
    }
}

impl RequestRetryPolicy for DefaultRetryPolicy {
    fn next_delay(&mut self) -> Option<Duration> {
        self.backoff.next()
    }
}

/// Never retries; the first failure is returned to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RequestRetryPolicy for NoRetry {
    fn next_delay(&mut self) -> Option<Duration> {
        None
    }
}

/// A [`RequestRetryPolicy`] described as plain data, so
/// [`crate::config::ClientConfig`] can carry one as a configuration field
/// rather than a runtime trait object (which would make `ClientConfig` not
/// `Serialize`/`Deserialize`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicyConfig {
    /// Retry on an [`ExponentialBackoff`] schedule with these parameters.
    ExponentialBackoff {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        max_attempts: u32,
    },
    /// Never retry.
    None,
}

impl RetryPolicyConfig {
    /// Build the runtime policy this configuration describes.
    pub fn to_policy(&self) -> Box<dyn RequestRetryPolicy + Send> {
        match self {
            RetryPolicyConfig::ExponentialBackoff {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                max_attempts,
            } => Box::new(DefaultRetryPolicy::new(ExponentialBackoff::new(
                Duration::from_millis(*initial_delay_ms),
                Duration::from_millis(*max_delay_ms),
                *multiplier,
                *max_attempts,
            ))),
            RetryPolicyConfig::None => Box::new(NoRetry),
        }
    }
}

impl Default for RetryPolicyConfig {
    /// Mirrors [`ExponentialBackoff::default`]'s parameters.
    fn default() -> Self {
        RetryPolicyConfig::ExponentialBackoff {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_attempts: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let mut b = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(350), 2.0, 10);
        assert_eq!(b.next(), Some(Duration::from_millis(100)));
        assert_eq!(b.next(), Some(Duration::from_millis(200)));
        assert_eq!(b.next(), Some(Duration::from_millis(350)));
        assert_eq!(b.next(), Some(Duration::from_millis(350)));
    }

    #[test]
    fn backoff_exhausts_after_max_attempts() {
        let mut b = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(1), 2.0, 2);
        assert!(b.next().is_some());
        assert!(b.next().is_some());
        assert!(b.next().is_none());
    }

    #[test]
    fn no_retry_never_retries() {
        assert!(NoRetry.next_delay().is_none());
    }

    #[test]
    fn retry_policy_config_none_builds_no_retry() {
        let mut policy = RetryPolicyConfig::None.to_policy();
        assert!(policy.next_delay().is_none());
    }

    #[test]
    fn retry_policy_config_default_round_trips_through_json() {
        let config = RetryPolicyConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: RetryPolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
    }
}
