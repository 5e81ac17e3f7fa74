//! Reconnection backoff for the event-stream client.

use std::time::Duration;

/// Exponential backoff policy: the k-th retry (0-indexed) waits
/// `base_interval * 2^k`, optionally capped and jittered.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Whether automatic reconnection is enabled at all.
    pub enabled: bool,
    /// Delay before the first retry.
    pub base_interval: Duration,
    /// Number of automatic retries before giving up.
    pub max_attempts: u32,
    /// Upper bound on a single delay. `None` leaves the doubling uncapped.
    pub max_delay: Option<Duration>,
    /// Randomize each delay by up to ±25%.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            base_interval: Duration::from_millis(3000),
            max_attempts: 10,
            max_delay: None,
            jitter: false,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether another automatic attempt is allowed after `attempts` retries.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.enabled && attempts < self.max_attempts
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let mut delay = self.base_interval.saturating_mul(factor);
        if let Some(cap) = self.max_delay {
            delay = delay.min(cap);
        }

        if self.jitter {
            let ms = delay.as_millis() as f64;
            let jitter = (rand::random::<f64>() - 0.5) * 2.0 * ms * 0.25;
            Duration::from_millis((ms + jitter).max(0.0) as u64)
        } else {
            delay
        }
    }
}
