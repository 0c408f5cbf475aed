use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::RetryConfig;
use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: config.attempt_timeout(),
            retry_delay: config.retry_delay(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub number: u32,
    pub previous_error: Option<ModelError>,
}

impl Attempt {
    pub fn is_retry(&self) -> bool {
        self.number > 0
    }
}

#[derive(Debug, Clone)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure {
    pub attempts: u32,
    pub last_error: ModelError,
}

/// Runs `attempt_fn` until it succeeds, fails with a non-retryable error, or the policy's
/// attempts are spent. Each attempt is cut off at `attempt_timeout`; a timeout ends the loop.
///
/// `on_failure` sees every failed attempt and may return `false` to stop early.
pub async fn retry_with<T, F, Fut, G>(
    policy: &RetryPolicy,
    mut attempt_fn: F,
    mut on_failure: G,
) -> Result<Retried<T>, RetryFailure>
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, ModelError>>,
    G: FnMut(&ModelError) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut previous_error: Option<ModelError> = None;
    let mut number = 0;

    loop {
        let attempt = Attempt {
            number,
            previous_error: previous_error.clone(),
        };
        let outcome = match tokio::time::timeout(policy.attempt_timeout, attempt_fn(attempt)).await
        {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(policy.attempt_timeout)),
        };
        number += 1;

        let err = match outcome {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: number,
                })
            }
            Err(err) => err,
        };

        let keep_going = on_failure(&err);
        if !keep_going || !err.is_retryable() || number >= max_attempts {
            return Err(RetryFailure {
                attempts: number,
                last_error: err,
            });
        }

        debug!(attempt = number, error = %err, "retrying model call");
        if !policy.retry_delay.is_zero() {
            tokio::time::sleep(policy.retry_delay).await;
        }
        previous_error = Some(err);
    }
}
