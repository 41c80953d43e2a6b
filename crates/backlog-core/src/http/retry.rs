//! Retry policy for server errors: decides backoff delays.

use std::time::Duration;

/// Backoff for 5xx responses, applied inside a single request.
///
/// This is separate from the queue's run counter: a request only surfaces as a
/// failure to the queue after this policy is exhausted.
#[derive(Debug, Clone)]
pub struct HttpRetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl HttpRetryPolicy {
    /// 0.1s, 0.2s, 0.4s, 0.8s, 1.6s, 3.2s.
    pub fn standard() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_retries: 6,
            max_delay: Duration::from_secs(30),
        }
    }

    /// No retries; the first 5xx is final.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    /// Delay before retry number `retry` (1-indexed), or `None` once the
    /// policy is exhausted.
    ///
    /// delay = min(base_delay * multiplier^(retry - 1), max_delay)
    pub fn next_delay(&self, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = Duration::try_from_secs_f64(delay_secs).unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

impl Default for HttpRetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
