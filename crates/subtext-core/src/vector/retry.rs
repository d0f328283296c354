use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::SubtextError;

/// Exponential backoff with jitter for the three network boundaries (vector
/// store, embedding, generation). Ported from the original system's
/// `retry_with_backoff` decorator, reimplemented as a higher-order async
/// function over a closure since Rust has no decorator syntax to reach for.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay: Duration::from_secs(1), factor: 2.0 }
    }
}

/// Status codes treated as transient and worth retrying.
pub const TRANSIENT_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

fn is_transient(err: &SubtextError) -> bool {
    match err {
        SubtextError::VectorStore(e) => e.is_timeout() || e.is_connect() || e.status().is_none(),
        SubtextError::VectorStoreStatus { status, .. } => TRANSIENT_STATUS_CODES.contains(status),
        SubtextError::Embedding(_) | SubtextError::Generation(_) => true,
        _ => false,
    }
}

/// Run `op`, retrying on transient failures with exponential backoff and
/// jitter. Non-transient errors propagate on the first attempt. Retries are
/// exhausted after `policy.max_attempts` total attempts.
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, op: F) -> Result<T, SubtextError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SubtextError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && is_transient(&err) => {
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
                warn!(attempt, %err, "transient failure, retrying after backoff");
                tokio::time::sleep(delay + jitter).await;
                delay = delay.mul_f64(policy.factor);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_attempts: 3, initial_delay: Duration::from_millis(1), factor: 1.0 };

        let result = with_backoff(policy, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(SubtextError::VectorStoreStatus { status: 503, body: "busy".into() })
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_propagate_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), SubtextError> = with_backoff(policy, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SubtextError::VectorStoreStatus { status: 404, body: "missing".into() })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
