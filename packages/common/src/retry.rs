use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::RetryConfig;

fn exponential_delay_ms(attempt: u8, base_ms: u64) -> u64 {
    let exp_factor = 2u64.saturating_pow(u32::from(attempt.saturating_sub(1)));
    base_ms.saturating_mul(exp_factor)
}

/// Decides when a failed delivery becomes eligible for another attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u8,
    base: Duration,
    max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u8, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            base,
            max,
        }
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Deterministic delay (no jitter) that must elapse after attempt number
    /// `attempts` before the next one.
    pub fn delay_after(&self, attempts: u8) -> Duration {
        if attempts == 0 {
            return Duration::ZERO;
        }
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(exponential_delay_ms(attempts, base_ms).min(max_ms))
    }

    /// Latest `last_attempt_at` at which a delivery that failed `attempts`
    /// times is due again at `now`. `None` once attempts are exhausted.
    pub fn due_cutoff(&self, attempts: u8, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if attempts >= self.max_attempts {
            return None;
        }
        let delay = chrono::Duration::from_std(self.delay_after(attempts)).ok()?;
        now.checked_sub_signed(delay)
    }

    /// Returns true when a delivery that failed `attempts` times, last at
    /// `last_attempt_at`, should be retried at `now`.
    pub fn is_due(&self, attempts: u8, last_attempt_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(cutoff) = self.due_cutoff(attempts, now) else {
            return false;
        };
        last_attempt_at.is_none_or(|last| last <= cutoff)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.base_secs),
            Duration::from_secs(config.max_secs),
        )
    }
}
