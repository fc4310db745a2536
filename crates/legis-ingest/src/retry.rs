//! Bounded exponential backoff for rate-limited requests.

use std::{future::Future, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

/// How often, and how patiently, to retry a rate-limited request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  /// Total attempts, including the first.
  pub max_attempts: u32,
  /// Wait before the second attempt; doubled after each further failure.
  pub base_delay:   Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_attempts: 3, base_delay: Duration::from_secs(2) }
  }
}

impl RetryPolicy {
  fn retries(&self) -> u32 { self.max_attempts.saturating_sub(1) }

  fn backoff(&self) -> ExponentialBuilder {
    let longest = self
      .base_delay
      .saturating_mul(2u32.saturating_pow(self.retries().saturating_sub(1)));
    ExponentialBuilder::default()
      .with_min_delay(self.base_delay)
      .with_max_delay(longest.max(self.base_delay))
      .with_factor(2.0)
      .with_max_times(self.retries() as usize)
  }

  /// Run `op` until it succeeds, fails with anything but a rate limit, or
  /// the attempt budget is spent. The last error is returned as-is.
  pub async fn run<T, F, Fut>(&self, what: &str, op: F) -> legis_sources::Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = legis_sources::Result<T>>,
  {
    let mut retry = 0u32;
    op.retry(self.backoff())
      .when(legis_sources::Error::is_rate_limited)
      .notify(|err, delay| {
        retry += 1;
        warn!(
          what,
          retry,
          delay_ms = delay.as_millis() as u64,
          error = %err,
          "rate limited; backing off"
        );
      })
      .await
  }
}
