use std::time::Duration;

use crate::config::RetryConfig;

/// Retry classification of a transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// Connection dropped, stalled, or the body came up short.
    Interrupted,
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Retryable server error (5xx).
    Http5xx(u16),
    /// Anything else: unwritable destination, abort, 4xx.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Exponential backoff with a cap on attempts and on delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        let base = if cfg.base_delay_secs > 0.0 {
            Duration::try_from_secs_f64(cfg.base_delay_secs).unwrap_or_else(|_| {
                Duration::from_secs_f64(RetryConfig::default().base_delay_secs)
            })
        } else {
            Duration::ZERO
        };
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: base,
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// `attempt` is 1-based: the attempt that just failed.
    pub fn decide(&self, attempt: u32, kind: RetryKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        match kind {
            RetryKind::Fatal => RetryDecision::NoRetry,
            RetryKind::Interrupted | RetryKind::Throttled | RetryKind::Http5xx(_) => {
                // base * 2^(attempt-1), capped
                let factor = 1u32 << attempt.saturating_sub(1).min(8);
                let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}
