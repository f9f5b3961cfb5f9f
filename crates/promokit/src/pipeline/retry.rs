//! Timeout, retry, and cancellation wrapper for capability calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::capabilities::CapabilityError;
use crate::config::RetryPolicy;
use crate::error::StageError;

/// Runs one external call under a composite deadline: the per-stage
/// timeout, the job's cancellation token, and the retry budget.
///
/// Only rate-limit, network, and transient classifications are retried;
/// auth and semantic rejections surface immediately, and an elapsed
/// deadline counts as a `Timeout` stage failure rather than another
/// attempt.
pub(crate) async fn call_with_policy<T, F, Fut>(
    timeout: Duration,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> Result<T, StageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CapabilityError>>,
{
    let mut attempt: u32 = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(StageError::cancelled());
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(StageError::cancelled()),
            result = tokio::time::timeout(timeout, op()) => result,
        };

        let error = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(capability)) => {
                StageError::new(capability.kind(), capability.to_string())
            }
            Err(_elapsed) => StageError::timeout(label, timeout.as_millis()),
        };

        if !error.kind.is_retryable() || attempt >= retry.max_attempts {
            return Err(error);
        }

        let backoff = retry.backoff_after(attempt);
        tracing::debug!(
            %label,
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %error,
            "retrying capability call"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(StageError::cancelled()),
            _ = tokio::time::sleep(backoff) => {}
        }
        attempt += 1;
    }
}
