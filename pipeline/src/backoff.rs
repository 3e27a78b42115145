//! Exponential backoff, generalized from the retry pattern used for database
//! operations elsewhere in the workspace: `delay = initial_delay * 2^attempt`,
//! capped at a configurable maximum, surfacing the last error after `max_retries`
//! unsuccessful attempts.

use std::fmt;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Backoff parameters shared by the exporter's scroll retries and the importer's
/// bulk-submit retries.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Delay is never allowed to exceed this, regardless of attempt count.
    pub max_delay: Duration,
    /// Number of retries attempted before giving up (not counting the first try).
    pub max_retries: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_retries: 60,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry attempt `attempt` (0-indexed), capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt).unwrap_or(u32::MAX);
        match self.initial_delay.checked_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX)) {
            Some(d) => d.min(self.max_delay),
            None => self.max_delay,
        }
    }
}

/// Run `op` until it succeeds or `config.max_retries` attempts have failed, sleeping
/// `config.delay_for(attempt)` between attempts. Surfaces the last error on exhaustion.
pub async fn retry<F, Fut, T, E>(config: BackoffConfig, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_retries {
                    return Err(err);
                }
                let delay = config.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    label,
                    attempt + 1,
                    config.max_retries + 1,
                    delay,
                    err
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delay_doubles_and_caps() {
        let config = BackoffConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
            max_retries: 10,
        };
        assert_eq!(config.delay_for(0), Duration::from_secs(1));
        assert_eq!(config.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.delay_for(2), Duration::from_secs(4));
        assert_eq!(config.delay_for(3), Duration::from_secs(8));
        assert_eq!(config.delay_for(4), Duration::from_secs(16));
        assert_eq!(config.delay_for(5), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_retries: 5,
        };

        let result = retry(config, "test-op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("not yet")
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_surfaces_last_error_after_exhaustion() {
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_retries: 2,
        };

        let result: Result<(), &str> =
            retry(config, "test-op", || async { Err("persistent failure") }).await;

        assert_eq!(result, Err("persistent failure"));
    }
}
