//! Retry with exponential backoff for idempotent collaborator reads
//!
//! Only reads (feed, history, search, comment listing) go through
//! [`with_retry`]. Writes are never retried, so a flaky connection can not
//! post the same Board comment twice.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_retries: u32,

    /// Backoff before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single backoff
    pub max_backoff: Duration,

    /// Backoff multiplier between attempts
    pub multiplier: f64,

    /// Add up to 25% random jitter to each backoff
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Default backoff curve with a custom attempt budget
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// A config that performs exactly one attempt
    pub fn none() -> Self {
        Self::with_max_retries(0)
    }

    /// Calculate backoff duration for a given attempt (0-based)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_secs_f64());

        let secs = if self.jitter {
            capped * (1.0 + jitter_fraction() * 0.25)
        } else {
            capped
        };

        Duration::from_secs_f64(secs)
    }
}

/// Cheap jitter in `[0.0, 1.0)` taken from the clock's sub-second nanos
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// Retry classification for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient failure, back off and try again
    Retry,
    /// Transient failure with a server-provided delay (e.g. `Retry-After`)
    RetryAfter(Duration),
    /// Permanent failure
    NoRetry,
}

/// Errors that know whether they are worth retrying
pub trait RetryableError {
    fn retry_decision(&self) -> RetryDecision;
}

/// Classify a transport error from `reqwest`
pub fn classify_reqwest(err: &reqwest::Error) -> RetryDecision {
    if err.is_connect() || err.is_timeout() {
        return RetryDecision::Retry;
    }
    match err.status().map(|s| s.as_u16()) {
        Some(429) => RetryDecision::RetryAfter(Duration::from_secs(60)),
        Some(500..=599) => RetryDecision::Retry,
        Some(_) => RetryDecision::NoRetry,
        None if err.is_decode() || err.is_builder() => RetryDecision::NoRetry,
        None => RetryDecision::Retry,
    }
}

/// Execute an async operation, retrying transient failures
///
/// Returns the first success, the first permanent error, or the last
/// transient error once `config.max_retries` is exhausted.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let decision = err.retry_decision();
        if decision == RetryDecision::NoRetry {
            debug!(
                operation = operation_name,
                attempt, "Operation failed with non-retryable error: {}", err
            );
            return Err(err);
        }

        if attempt >= config.max_retries {
            warn!(
                operation = operation_name,
                attempts = attempt + 1,
                "Operation failed after {} attempts: {}",
                attempt + 1,
                err
            );
            return Err(err);
        }

        let backoff = match decision {
            RetryDecision::RetryAfter(d) => d.min(config.max_backoff),
            _ => config.backoff_duration(attempt),
        };

        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            max_attempts = config.max_retries + 1,
            backoff_secs = backoff.as_secs_f64(),
            "Retrying after error: {}",
            err
        );

        sleep(backoff).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_duration() {
        let config = RetryConfig {
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.backoff_duration(0), Duration::from_secs(1));
        assert_eq!(config.backoff_duration(1), Duration::from_secs(2));
        assert_eq!(config.backoff_duration(3), Duration::from_secs(8));
        assert_eq!(config.backoff_duration(7), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_with_jitter() {
        let config = RetryConfig::default();
        let backoff = config.backoff_duration(0);
        assert!(backoff >= Duration::from_secs(1));
        assert!(backoff <= Duration::from_millis(1250));
    }

    #[derive(Debug)]
    struct FlakyError {
        transient: bool,
    }

    impl std::fmt::Display for FlakyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "FlakyError(transient={})", self.transient)
        }
    }

    impl RetryableError for FlakyError {
        fn retry_decision(&self) -> RetryDecision {
            if self.transient {
                RetryDecision::Retry
            } else {
                RetryDecision::NoRetry
            }
        }
    }

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_eventually() {
        let mut attempts = 0;
        let result: Result<&str, FlakyError> = with_retry(&fast(3), "feed", || {
            attempts += 1;
            let n = attempts;
            async move {
                if n < 3 {
                    Err(FlakyError { transient: true })
                } else {
                    Ok("records")
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some("records"));
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let mut attempts = 0;
        let result: Result<(), FlakyError> = with_retry(&fast(2), "history", || {
            attempts += 1;
            async { Err(FlakyError { transient: true }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_permanent_error() {
        let mut attempts = 0;
        let result: Result<(), FlakyError> = with_retry(&fast(5), "search", || {
            attempts += 1;
            async { Err(FlakyError { transient: false }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_none_makes_single_attempt() {
        let mut attempts = 0;
        let result: Result<(), FlakyError> = with_retry(&RetryConfig::none(), "search", || {
            attempts += 1;
            async { Err(FlakyError { transient: true }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }
}
