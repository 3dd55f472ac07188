//! Bounded retry with feedback threading
//!
//! Three loops share this shape: gateway calls retried on transient errors,
//! plan steps retried on failed verification, and review cycles retried on a
//! failing grade. [`retry_with`] runs an operation until it succeeds, the
//! error is not retryable, or the attempt budget is spent. Each attempt
//! receives the previous attempt's error so it can inject feedback.

use std::future::Future;
use std::time::Duration;

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// `base * 2^(n-1)` after the n-th failure, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(31) as u32;
                base.saturating_mul(1u32 << exponent).min(max)
            }
        }
    }
}

/// Attempt budget and backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: usize,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Up to `max_attempts` attempts, back to back.
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    pub fn once() -> Self {
        Self::immediate(1)
    }
}

/// Input of one attempt.
#[derive(Debug)]
pub struct Attempt<E> {
    /// 1-based attempt number.
    pub number: usize,
    /// Error of the attempt before this one.
    pub previous: Option<E>,
}

impl<E> Attempt<E> {
    pub fn is_first(&self) -> bool {
        self.number == 1
    }
}

/// Successful value and the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: usize,
}

/// Final error of a failed retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryError<E> {
    pub attempts: usize,
    pub error: E,
    /// `true` when the budget ran out; `false` when the error was not
    /// retryable.
    pub exhausted: bool,
}

/// Run `op` until it succeeds, fails with an error `should_retry` rejects,
/// or `policy.max_attempts` attempts have been made.
pub async fn retry_with<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<Retried<T>, RetryError<E>>
where
    F: FnMut(Attempt<E>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut previous = None;
    let mut number = 1;

    loop {
        match op(Attempt {
            number,
            previous: previous.take(),
        })
        .await
        {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: number,
                });
            }
            Err(error) => {
                if !should_retry(&error) {
                    return Err(RetryError {
                        attempts: number,
                        error,
                        exhausted: false,
                    });
                }
                if number >= policy.max_attempts {
                    return Err(RetryError {
                        attempts: number,
                        error,
                        exhausted: true,
                    });
                }

                let delay = policy.backoff.delay_for(number);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                previous = Some(error);
                number += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_exponential_delay_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            max: Duration::from_millis(350),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(350));
        assert_eq!(backoff.delay_for(64), Duration::from_millis(350));
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_first_success_needs_one_attempt() {
        let result = retry_with(&RetryPolicy::immediate(3), |_: &String| true, |_| async {
            Ok::<_, String>(7)
        })
        .await
        .unwrap();
        assert_eq!(result, Retried { value: 7, attempts: 1 });
    }

    #[tokio::test]
    async fn test_feedback_threads_into_next_attempt() {
        let seen = Mutex::new(Vec::new());
        let result = retry_with(&RetryPolicy::immediate(3), |_: &String| true, |attempt| {
            seen.lock().unwrap().push(attempt.previous.clone());
            async move {
                if attempt.number < 3 {
                    Err(format!("rejected #{}", attempt.number))
                } else {
                    Ok(attempt.number)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.attempts, 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("rejected #1".to_string()), Some("rejected #2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let err = retry_with(&RetryPolicy::immediate(2), |_: &usize| true, |attempt| async move {
            Err::<(), _>(attempt.number)
        })
        .await
        .unwrap_err();
        assert_eq!(
            err,
            RetryError {
                attempts: 2,
                error: 2,
                exhausted: true
            }
        );
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let err = retry_with(
            &RetryPolicy::immediate(5),
            |e: &&str| *e != "fatal",
            |_| async { Err::<(), _>("fatal") },
        )
        .await
        .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(!err.exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let policy = RetryPolicy::new(
            3,
            Backoff::Exponential {
                base: Duration::from_millis(500),
                max: Duration::from_secs(8),
            },
        );
        let start = tokio::time::Instant::now();
        let _ = retry_with(&policy, |_: &()| true, |_| async { Err::<(), _>(()) }).await;
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }
}
