//! Bounded retry around structuring calls

use crate::config::RetryConfig;
use crate::metrics::PipelineMetrics;
use docstruct_domain::ServiceFailure;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// A structuring attempt that failed or ran out of time
#[derive(Error, Debug)]
pub enum CallError<E: ServiceFailure> {
    /// The service reported a failure
    #[error(transparent)]
    Service(E),

    /// The attempt exceeded the per-call bound
    #[error("Call timed out after {0:?}")]
    TimedOut(Duration),
}

impl<E: ServiceFailure> ServiceFailure for CallError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            CallError::Service(e) => e.is_retryable(),
            CallError::TimedOut(_) => true,
        }
    }

    fn class(&self) -> &'static str {
        match self {
            CallError::Service(e) => e.class(),
            CallError::TimedOut(_) => "Timeout",
        }
    }
}

/// Invokes an operation until it succeeds, fails terminally, or runs out of attempts
#[derive(Debug, Clone)]
pub struct RetryingInvoker {
    config: RetryConfig,
    metrics: PipelineMetrics,
}

impl RetryingInvoker {
    /// Create an invoker with the given policy
    pub fn new(config: RetryConfig, metrics: PipelineMetrics) -> Self {
        Self { config, metrics }
    }

    /// Retry policy in use
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `op` at most `max_attempts` times
    ///
    /// Only failures whose `is_retryable()` is true are retried. When the
    /// budget is exhausted the last failure is returned.
    pub async fn invoke<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: ServiceFailure,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    debug!("Attempt {} failed terminally: {}", attempt, e);
                    return Err(e);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!("Giving up after {} attempts: {}", attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.config.delay_after(attempt);
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    self.metrics.record_retry();
                    attempt += 1;
                }
            }
        }
    }
}
