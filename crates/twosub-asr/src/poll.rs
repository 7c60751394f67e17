//! Bounded fixed-interval polling.
//!
//! Each attempt either reports the task as still pending or yields its
//! payload. Cancellation is checked before every attempt and raced against
//! both the attempt and the sleep that follows it. There is no backoff and
//! no jitter.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use twosub_settings::PollingSettings;

use crate::errors::{AsrError, AsrResult};

/// Interval and attempt cap for a poll loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Attempts before failing with [`AsrError::Timeout`].
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingSettings::default())
    }
}

impl From<&PollingSettings> for PollPolicy {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: settings.interval(),
            max_attempts: settings.max_attempts,
        }
    }
}

/// Outcome of one poll attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Not finished; try again after the interval.
    Pending,
    /// Finished with this payload.
    Complete(T),
}

/// Call `attempt` until it completes, fails, is cancelled or the cap is hit.
///
/// `attempt` receives the 1-based attempt number. Errors from an attempt
/// end the loop immediately; only [`PollStatus::Pending`] is retried.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut attempt: F,
) -> AsrResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AsrResult<PollStatus<T>>>,
{
    for n in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            debug!(task = label, attempt = n, "poll cancelled before attempt");
            return Err(AsrError::Cancelled);
        }

        let status = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AsrError::Cancelled),
            status = attempt(n) => status?,
        };

        if let PollStatus::Complete(value) = status {
            debug!(task = label, attempt = n, "poll complete");
            return Ok(value);
        }
        debug!(task = label, attempt = n, max = policy.max_attempts, "task pending");

        if n < policy.max_attempts {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AsrError::Cancelled),
                () = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    Err(AsrError::Timeout {
        attempts: policy.max_attempts,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[test]
    fn default_policy_matches_settings() {
        let p = PollPolicy::default();
        assert_eq!(p.interval, Duration::from_secs(1));
        assert_eq!(p.max_attempts, 500);
    }

    #[tokio::test]
    async fn stops_at_first_complete() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let token = CancellationToken::new();

        let out = poll_until(&fast(10), &token, "t", move |n| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(if n == 3 {
                    PollStatus::Complete("done")
                } else {
                    PollStatus::Pending
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(out, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cap_is_exact() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let token = CancellationToken::new();

        let err = poll_until(&fast(4), &token, "t", move |_| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollStatus::<()>::Pending) }
        })
        .await
        .unwrap_err();

        assert_matches!(err, AsrError::Timeout { attempts: 4 });
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancel_between_attempts_is_not_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let token = CancellationToken::new();
        let trigger = token.clone();

        let err = poll_until(&fast(50), &token, "t", move |n| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            if n == 2 {
                trigger.cancel();
            }
            async { Ok(PollStatus::<()>::Pending) }
        })
        .await
        .unwrap_err();

        assert_matches!(err, AsrError::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_token_makes_no_attempt() {
        let token = CancellationToken::new();
        token.cancel();
        let err = poll_until(&fast(5), &token, "t", |_| async {
            Ok(PollStatus::Complete(()))
        })
        .await
        .unwrap_err();
        assert_matches!(err, AsrError::Cancelled);
    }

    #[tokio::test]
    async fn cancel_interrupts_long_sleep() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let policy = PollPolicy {
            interval: Duration::from_secs(3600),
            max_attempts: 3,
        };

        let handle = tokio::spawn(async move {
            poll_until(&policy, &token, "t", |_| async { Ok(PollStatus::<()>::Pending) }).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();

        let err = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poll loop ignored cancellation")
            .unwrap()
            .unwrap_err();
        assert_matches!(err, AsrError::Cancelled);
    }

    #[tokio::test]
    async fn attempt_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let token = CancellationToken::new();

        let err = poll_until(&fast(10), &token, "t", move |_| {
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<PollStatus<()>, _>(AsrError::protocol("missing state in response")) }
        })
        .await
        .unwrap_err();

        assert_matches!(err, AsrError::Protocol(_));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
