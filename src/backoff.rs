//! Retry control for rate-limited inference calls.
//!
//! Only a rate-limit status (429) is retryable. Each retry waits the schedule
//! entry for the current attempt index, so the schedule length is the retry
//! budget. Anything else ends the call on the spot.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::InferenceError;

/// HTTP status that marks a rate-limited response.
pub const RATE_LIMITED: u16 = 429;

/// Default wait before each retry, in milliseconds.
pub const DEFAULT_BACKOFF_MS: [u64; 3] = [5_000, 10_000, 15_000];

/// Fixed backoff schedule, one wait per retry index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    schedule: Vec<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_millis(&DEFAULT_BACKOFF_MS)
    }
}

/// What to do after a response has been classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `wait`, then re-issue the same request as attempt `next_attempt`.
    Retry { wait: Duration, next_attempt: u32 },
    /// Hand the response back to the caller as-is.
    Stop,
}

/// Progress report emitted before each backoff sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryNotice {
    /// 1-based number of the retry about to happen.
    pub attempt: u32,
    pub max_retries: u32,
    pub wait: Duration,
}

/// Attempt counter for one call. Only rate-limit responses advance it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
}

impl BackoffPolicy {
    pub fn new(schedule: Vec<Duration>) -> Self {
        Self { schedule }
    }

    pub fn from_millis(schedule_ms: &[u64]) -> Self {
        Self::new(schedule_ms.iter().copied().map(Duration::from_millis).collect())
    }

    pub fn max_retries(&self) -> u32 {
        self.schedule.len() as u32
    }

    pub fn schedule(&self) -> &[Duration] {
        &self.schedule
    }

    /// Decide whether a response with `status` at attempt index `attempt` is retried.
    pub fn decide(&self, status: u16, attempt: u32) -> RetryDecision {
        if status != RATE_LIMITED || attempt >= self.max_retries() {
            return RetryDecision::Stop;
        }
        match self.schedule.get(attempt as usize) {
            Some(wait) => RetryDecision::Retry {
                wait: *wait,
                next_attempt: attempt + 1,
            },
            None => RetryDecision::Stop,
        }
    }
}

/// Anything that carries an HTTP-style status code.
pub trait StatusOutcome {
    fn status_code(&self) -> u16;
}

impl StatusOutcome for reqwest::Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Issue a request until it succeeds, fails terminally, or the schedule runs out.
///
/// `send` must rebuild the identical request each time it is called.
/// `on_retry` runs before every backoff sleep.
///
/// Returns the response only when its status is 2xx. A 429 left over after the
/// last retry becomes [`InferenceError::RateLimitExhausted`]; any other status
/// becomes [`InferenceError::Server`]. Transport errors from `send` are not retried.
pub async fn send_with_backoff<R, F, Fut, N>(
    policy: &BackoffPolicy,
    mut send: F,
    mut on_retry: N,
) -> Result<R, InferenceError>
where
    R: StatusOutcome,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, InferenceError>>,
    N: FnMut(RetryNotice),
{
    let mut state = RetryState::default();
    loop {
        let response = send().await?;
        let status = response.status_code();
        match policy.decide(status, state.attempt) {
            RetryDecision::Retry { wait, next_attempt } => {
                let notice = RetryNotice {
                    attempt: next_attempt,
                    max_retries: policy.max_retries(),
                    wait,
                };
                warn!(
                    attempt = next_attempt,
                    max_retries = notice.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited by inference service, backing off"
                );
                on_retry(notice);
                tokio::time::sleep(wait).await;
                state.attempt = next_attempt;
            }
            RetryDecision::Stop => {
                debug!(status, attempt = state.attempt, "Inference call settled");
                return match status {
                    200..=299 => Ok(response),
                    RATE_LIMITED => Err(InferenceError::RateLimitExhausted {
                        attempts: state.attempt,
                    }),
                    _ => Err(InferenceError::Server { status }),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    impl StatusOutcome for u16 {
        fn status_code(&self) -> u16 {
            *self
        }
    }

    fn scripted(statuses: &[u16]) -> VecDeque<u16> {
        statuses.iter().copied().collect()
    }

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(
            policy.schedule(),
            &[
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(15)
            ]
        );
    }

    #[test]
    fn test_decide_retries_rate_limit_within_budget() {
        let policy = BackoffPolicy::default();
        assert_eq!(
            policy.decide(429, 0),
            RetryDecision::Retry {
                wait: Duration::from_secs(5),
                next_attempt: 1
            }
        );
        assert_eq!(
            policy.decide(429, 2),
            RetryDecision::Retry {
                wait: Duration::from_secs(15),
                next_attempt: 3
            }
        );
    }

    #[test]
    fn test_decide_never_retries_past_budget() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.decide(429, 3), RetryDecision::Stop);
        assert_eq!(policy.decide(429, 7), RetryDecision::Stop);
    }

    #[test]
    fn test_decide_stops_on_other_statuses() {
        let policy = BackoffPolicy::default();
        for status in [200, 400, 401, 500, 503] {
            assert_eq!(policy.decide(status, 0), RetryDecision::Stop);
        }
    }

    #[test]
    fn test_empty_schedule_never_retries() {
        let policy = BackoffPolicy::new(Vec::new());
        assert_eq!(policy.max_retries(), 0);
        assert_eq!(policy.decide(429, 0), RetryDecision::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_uses_full_schedule() {
        let policy = BackoffPolicy::default();
        let mut statuses = scripted(&[429, 429, 429, 429, 200]);
        let mut calls = 0;
        let mut notices = Vec::new();
        let started = Instant::now();

        let result = send_with_backoff(
            &policy,
            || {
                calls += 1;
                let status = statuses.pop_front().unwrap();
                async move { Ok::<u16, InferenceError>(status) }
            },
            |notice| notices.push(notice),
        )
        .await;

        assert!(matches!(
            result,
            Err(InferenceError::RateLimitExhausted { attempts: 3 })
        ));
        assert_eq!(calls, 4);
        assert_eq!(
            notices.iter().map(|n| n.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            notices.iter().map(|n| n.wait).collect::<Vec<_>>(),
            policy.schedule().to_vec()
        );
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_rate_limit() {
        let policy = BackoffPolicy::default();
        let mut statuses = scripted(&[429, 200]);
        let mut calls = 0;

        let result = send_with_backoff(
            &policy,
            || {
                calls += 1;
                let status = statuses.pop_front().unwrap();
                async move { Ok::<u16, InferenceError>(status) }
            },
            |_| {},
        )
        .await;

        assert_eq!(result.unwrap(), 200);
        assert_eq!(calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_terminal_without_retry() {
        let policy = BackoffPolicy::default();
        let mut calls = 0;
        let started = Instant::now();

        let result = send_with_backoff(
            &policy,
            || {
                calls += 1;
                async { Ok::<u16, InferenceError>(503) }
            },
            |_| panic!("server errors must not back off"),
        )
        .await;

        assert!(matches!(result, Err(InferenceError::Server { status: 503 })));
        assert_eq!(calls, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let policy = BackoffPolicy::default();
        let mut calls = 0;

        let result: Result<u16, _> = send_with_backoff(
            &policy,
            || {
                calls += 1;
                async { Err(InferenceError::Transport("connection reset".into())) }
            },
            |_| {},
        )
        .await;

        assert!(matches!(result, Err(InferenceError::Transport(_))));
        assert_eq!(calls, 1);
    }
}
