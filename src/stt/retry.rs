//! Retry policy and the sleep seam used between attempts.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::RetryConfig;
use crate::stt::engine::TranscribeError;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How often a chunk is retried and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first. Never less than 1.
    pub attempts: u32,
    pub base_delay: Duration,
    pub inter_chunk_pause: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            inter_chunk_pause: Duration::from_millis(config.inter_chunk_pause_ms),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    ///
    /// Rate limits back off exponentially (`base * 2^attempt`), everything
    /// else linearly (`base * attempt`).
    pub fn backoff(&self, attempt: u32, err: &TranscribeError) -> Duration {
        let factor = if err.is_rate_limited() {
            2u32.saturating_pow(attempt)
        } else {
            attempt
        };
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Waits for a duration. Swapped out in tests to observe backoff delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pub delays: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(2000),
            inter_chunk_pause: Duration::from_millis(500),
        }
    }

    #[test]
    fn rate_limit_backoff_is_exponential() {
        let err = TranscribeError::RateLimited("429".into());
        let p = policy();
        assert_eq!(p.backoff(1, &err), Duration::from_millis(4000));
        assert_eq!(p.backoff(2, &err), Duration::from_millis(8000));
        assert_eq!(p.backoff(3, &err), Duration::from_millis(16000));
    }

    #[test]
    fn other_failures_back_off_linearly() {
        let err = TranscribeError::Timeout;
        let p = policy();
        assert_eq!(p.backoff(1, &err), Duration::from_millis(2000));
        assert_eq!(p.backoff(2, &err), Duration::from_millis(4000));
        assert_eq!(p.backoff(3, &err), Duration::from_millis(6000));
    }

    #[test]
    fn zero_attempts_in_config_means_one() {
        let cfg = RetryConfig {
            attempts: 0,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&cfg).attempts, 1);
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let err = TranscribeError::RateLimited(String::new());
        let p = policy();
        assert_eq!(p.backoff(64, &err), p.base_delay.saturating_mul(u32::MAX));
    }
}
