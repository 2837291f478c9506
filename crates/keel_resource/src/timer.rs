//! Bounded polling with constant backoff.
//!
//! [`poll_until`] repeatedly evaluates a check until it reports `true`, fails,
//! or the attempt budget derived from `max_duration / delay` runs out. It is
//! the only timeout mechanism in this crate: nothing is cancelled, the caller
//! just stops waiting.

use core::future::Future;
use core::time::Duration;
use std::error::Error;

use keel_outcome::{Cause, ErrorKind, Failure, Outcome};
use serde_json::json;

/// Final state of a [`poll_until`] run.
#[derive(Debug)]
pub enum PollStatus<E> {
    /// The check returned `true`.
    Succeeded {
        /// Checks performed, including the successful one.
        attempts: u32,
    },
    /// Every attempt returned `false`.
    TimedOut {
        /// Checks performed.
        attempts: u32,
    },
    /// The check returned an error; polling stopped immediately.
    ConditionFailed {
        /// Checks performed, including the failing one.
        attempts: u32,
        /// The check's error.
        error: E,
    },
}

impl<E> PollStatus<E> {
    /// Number of checks performed.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts }
            | Self::TimedOut { attempts }
            | Self::ConditionFailed { attempts, .. } => *attempts,
        }
    }

    /// Returns `true` if the check returned `true`.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Attempt budget for `max_duration` at constant `delay`: the ceiling of
/// their ratio, at least 1.
#[must_use]
pub fn max_attempts(delay: Duration, max_duration: Duration) -> u32 {
    if delay.is_zero() {
        return 1;
    }
    let attempts = max_duration.as_nanos().div_ceil(delay.as_nanos());
    u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
}

/// Evaluates `check` every `delay` until it returns `true` or `Err`, for at
/// most [`max_attempts`] attempts.
pub async fn poll_until<F, Fut, E>(
    delay: Duration,
    max_duration: Duration,
    mut check: F,
) -> PollStatus<E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let budget = max_attempts(delay, max_duration);

    for attempt in 1..=budget {
        match check().await {
            Ok(true) => return PollStatus::Succeeded { attempts: attempt },
            Ok(false) => {}
            Err(error) => {
                return PollStatus::ConditionFailed {
                    attempts: attempt,
                    error,
                };
            }
        }
        if attempt < budget {
            tokio::time::sleep(delay).await;
        }
    }

    PollStatus::TimedOut { attempts: budget }
}

/// Failures of [`wait_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerErrorKind {
    /// The check returned an error.
    CheckFunction,
    /// The attempt budget ran out.
    Timeout,
}

impl ErrorKind for TimerErrorKind {
    fn name(&self) -> &'static str {
        match self {
            Self::CheckFunction => "TimerCheckFunctionError",
            Self::Timeout => "TimerTimeoutError",
        }
    }
}

/// [`poll_until`] reported as an outcome carrying the attempt count.
pub async fn wait_until<F, Fut, E>(
    delay: Duration,
    max_duration: Duration,
    check: F,
) -> Outcome<u32, TimerErrorKind>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Error + Send + Sync + 'static,
{
    let millis = |duration: Duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    let details = |attempts: u32| {
        json!({
            "attempts": attempts,
            "delay_ms": millis(delay),
            "max_duration_ms": millis(max_duration),
        })
    };

    match poll_until(delay, max_duration, check).await {
        PollStatus::Succeeded { attempts } => Outcome::success("wait condition met", attempts),
        PollStatus::TimedOut { attempts } => {
            Failure::build("wait timed out", TimerErrorKind::Timeout)
                .details(details(attempts))
                .into_outcome()
        }
        PollStatus::ConditionFailed { attempts, error } => {
            Failure::build("wait check failed", TimerErrorKind::CheckFunction)
                .details(details(attempts))
                .cause(Cause::error(error))
                .into_outcome()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("probe exploded")]
    struct ProbeError;

    #[test]
    fn budget_is_ceiling_of_ratio() {
        let ms = Duration::from_millis;
        assert_eq!(max_attempts(ms(50), ms(2000)), 40);
        assert_eq!(max_attempts(ms(300), ms(1000)), 4);
        assert_eq!(max_attempts(ms(500), ms(100)), 1);
        assert_eq!(max_attempts(ms(100), Duration::ZERO), 1);
        assert_eq!(max_attempts(Duration::ZERO, ms(100)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let status = poll_until(Duration::from_millis(10), Duration::from_millis(35), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(false) }
        })
        .await;

        assert!(matches!(status, PollStatus::TimedOut { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_as_soon_as_check_passes() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let status = poll_until(Duration::from_millis(10), Duration::from_secs(1), || {
            let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, Infallible>(seen == 3) }
        })
        .await;

        assert_eq!(status.attempts(), 3);
        assert!(status.is_succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn check_error_stops_polling() {
        let outcome = wait_until(Duration::from_millis(10), Duration::from_secs(1), || async {
            Err::<bool, _>(ProbeError)
        })
        .await;

        assert_eq!(outcome.kind(), Some(TimerErrorKind::CheckFunction));
        assert_eq!(
            outcome.cause_kind_chain(),
            ["TimerCheckFunctionError", "ProbeError"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_reported_as_failure() {
        let outcome = wait_until(Duration::from_millis(10), Duration::from_millis(20), || async {
            Ok::<_, ProbeError>(false)
        })
        .await;

        let failure = outcome.failure_ref().expect("timed out");
        assert_eq!(failure.kind(), TimerErrorKind::Timeout);
        assert_eq!(failure.details()["attempts"], 2);
    }
}
