//! Exponential backoff with jitter, used by the initial CLI spawn
//! (transient `ENOENT`/busy-resource failures) and by MCP server
//! reconnection.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Retry policy: up to `max_attempts` tries, doubling `base_delay` each time
/// up to `max_delay`, with up to 50% jitter applied to each computed delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis().saturating_mul(1u128 << attempt.min(20));
        let capped = exp.min(self.max_delay.as_millis());
        let jitter_fraction = rand::thread_rng().gen_range(0.5..1.0);
        let jittered = (capped as f64 * jitter_fraction) as u64;
        Duration::from_millis(jittered)
    }

    /// Run `operation` until it succeeds or `max_attempts` is exhausted.
    /// The last error is returned if every attempt fails.
    pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    log::debug!("retrying after {delay:?} (attempt {attempt}/{})", self.max_attempts);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
