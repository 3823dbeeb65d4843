//! Exponential backoff policy for reconnection attempts.

use std::time::Duration;

use linguahub_core::config::realtime::RealtimeConfig;

/// Reconnection schedule: bounded attempt count with exponentially
/// growing delays.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Multiplier applied per additional attempt.
    pub growth_factor: f64,
}

impl ReconnectPolicy {
    /// Builds the policy from configuration.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
            growth_factor: config.reconnect_backoff_multiplier,
        }
    }

    /// Returns the delay before the given attempt (1-based):
    /// `base_delay * growth_factor^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.growth_factor.powi(exponent as i32);
        let millis = self.base_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64)
    }

    /// Returns whether the attempt budget is spent.
    pub fn exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::from_config(&RealtimeConfig::default())
    }

    #[test]
    fn test_delay_series() {
        let policy = policy();
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4500));
        assert_eq!(policy.delay_for(4), Duration::from_millis(6750));
        assert_eq!(policy.delay_for(5), Duration::from_millis(10125));
    }

    #[test]
    fn test_delays_strictly_increase() {
        let policy = policy();
        for attempt in 1..policy.max_attempts {
            assert!(policy.delay_for(attempt + 1) > policy.delay_for(attempt));
        }
    }

    #[test]
    fn test_attempt_budget() {
        let policy = policy();
        assert!(!policy.exhausted(4));
        assert!(policy.exhausted(5));
        assert!(policy.exhausted(6));
    }
}
