//! Fixed-delay retry for flaky upstream calls.

use std::future::Future;
use std::time::Duration;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

impl Default for RetryPolicy {
    /// Two attempts, 200 ms apart.
    fn default() -> Self {
        Self::new(2, Duration::from_millis(200))
    }
}

/// Run `op` until it succeeds or `policy.attempts` tries are spent.
///
/// Returns the last error when every attempt fails. An `attempts` of zero is
/// treated as one.
pub async fn retry_async<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(_) => {
                tracing::debug!(attempt, "upstream call failed, retrying");
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn second_attempt_can_succeed() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_async(RetryPolicy::new(2, Duration::ZERO), || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("boom")
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_policy_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), u32> = retry_async(RetryPolicy::new(3, Duration::ZERO), || async {
            Err(calls.fetch_add(1, Ordering::SeqCst))
        })
        .await;
        assert_eq!(result, Err(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
