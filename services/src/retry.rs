use std::future::Future;
use std::time::Duration;

use crate::error::IngestError;

/// Bounded retry: how many attempts and how long to wait between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Two units raced to create the same row; the next read resolves it,
    /// so no backoff is needed.
    pub const IDENTITY: RetryPolicy = RetryPolicy {
        attempts: 3,
        delay: Duration::ZERO,
    };

    /// A vulnerability match arrived before the SBOM merge it depends on;
    /// give the concurrent unit time to finish.
    pub const DEPENDENCY: RetryPolicy = RetryPolicy {
        attempts: 3,
        delay: Duration::from_secs(5),
    };

    /// Store contention (deadlocks, lock timeouts) may need more attempts
    /// than identity races.
    pub const CONTENTION: RetryPolicy = RetryPolicy {
        attempts: 6,
        delay: Duration::from_secs(5),
    };
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt bound is spent. An operation that keeps failing
/// retryably is invoked exactly `policy.attempts` times, then surfaced as
/// [`IngestError::RetriesExhausted`].
pub async fn retry<T, F, Fut, P>(
    policy: RetryPolicy,
    retryable: P,
    mut op: F,
) -> Result<T, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IngestError>>,
    P: Fn(&IngestError) -> bool,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if retryable(&err) && attempt < policy.attempts => {
                log::warn!(
                    "attempt {}/{} failed: {}, retrying",
                    attempt,
                    policy.attempts,
                    err
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(err) if retryable(&err) => {
                return Err(IngestError::RetriesExhausted {
                    attempts: policy.attempts,
                    source: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn conflict() -> IngestError {
        IngestError::Conflict("duplicate key".into())
    }

    #[tokio::test]
    async fn always_failing_op_is_attempted_exactly_bound_times() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 4,
            delay: Duration::ZERO,
        };
        let result: Result<(), _> = retry(policy, IngestError::is_conflict, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(conflict()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(IngestError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 4);
                assert!(source.is_conflict());
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry(RetryPolicy::IDENTITY, IngestError::is_conflict, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(conflict())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_is_surfaced_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(RetryPolicy::CONTENTION, IngestError::is_transient, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(IngestError::Malformed("nope".into())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(IngestError::Malformed(_))));
    }
}
