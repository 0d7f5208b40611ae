//! Retry schedule for transient transport failures.

use std::time::Duration;

use batchexecute::{RetryPolicy, TransportError};

/// Bounds on how often and how slowly a request is re-issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Total attempts, including the first. `1` disables retry.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after.
    pub base_delay: Duration,
    /// Ceiling on the exponential delay.
    pub max_delay: Duration,
    /// Delay per consecutive gateway rate-limit response.
    pub rate_limit_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            rate_limit_delay: Duration::from_secs(5),
        }
    }
}

impl RetrySettings {
    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// How long to wait after `attempt` (1-based) failed with `error`, or
    /// `None` when the failure is final.
    ///
    /// `rate_limited` counts the rate-limit responses seen so far, including
    /// this one; those back off linearly by [`rate_limit_delay`]. Everything
    /// else backs off exponentially from [`base_delay`], capped at
    /// [`max_delay`].
    ///
    /// [`rate_limit_delay`]: Self::rate_limit_delay
    /// [`base_delay`]: Self::base_delay
    /// [`max_delay`]: Self::max_delay
    pub fn delay_after(
        &self,
        attempt: u32,
        rate_limited: u32,
        error: &TransportError,
    ) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match error.retry_policy() {
            RetryPolicy::NonRetryable => None,
            RetryPolicy::Retryable { after: Some(after) } => Some(after),
            RetryPolicy::Retryable { after: None } => {
                if matches!(error, TransportError::RateLimited { .. }) {
                    return Some(self.rate_limit_delay.saturating_mul(rate_limited.max(1)));
                }
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> TransportError {
        TransportError::Status {
            status: code,
            url: "https://play.google.com".into(),
        }
    }

    #[test]
    fn server_errors_back_off_exponentially_up_to_the_cap() {
        let settings = RetrySettings {
            max_attempts: 10,
            ..RetrySettings::default()
        };
        let delays: Vec<_> = (1..=6)
            .map(|attempt| settings.delay_after(attempt, 0, &status(503)).unwrap())
            .collect();
        assert_eq!(
            delays,
            [500, 1000, 2000, 4000, 8000, 10_000].map(Duration::from_millis)
        );
    }

    #[test]
    fn rate_limits_back_off_linearly() {
        let settings = RetrySettings {
            max_attempts: 5,
            ..RetrySettings::default()
        };
        let error = TransportError::RateLimited {
            url: "https://play.google.com".into(),
        };
        assert_eq!(settings.delay_after(1, 1, &error), Some(Duration::from_secs(5)));
        assert_eq!(settings.delay_after(2, 2, &error), Some(Duration::from_secs(10)));
    }

    #[test]
    fn final_attempt_and_client_errors_do_not_retry() {
        let settings = RetrySettings::default();
        assert_eq!(settings.delay_after(3, 0, &status(503)), None);
        assert_eq!(settings.delay_after(1, 0, &status(400)), None);
        assert_eq!(
            settings.delay_after(
                1,
                0,
                &TransportError::NotFound {
                    url: "https://play.google.com".into()
                }
            ),
            None
        );
        assert_eq!(RetrySettings::disabled().delay_after(1, 0, &status(503)), None);
    }
}
