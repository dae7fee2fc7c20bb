//! Bounded fixed-interval polling.
//!
//! `poll_until` repeats a fetch until a terminal predicate holds or the attempt
//! budget is spent. Attempts never overlap; after every non-terminal attempt the
//! loop sleeps exactly one interval on the injected [`Clock`].

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use vidresize_core::{JobHandle, JobState, JobStatus, WorkflowError, WorkflowResult};

use crate::api::ResizeApi;

/// Source of delays. Production uses tokio's timer; tests record instead of waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Interval and attempt budget for one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5), // processor status refresh cadence
            max_attempts: 30,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping before giving up.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// A terminal value and the attempt that produced it (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Debug)]
pub enum PollError<E> {
    /// No terminal value within `max_attempts`.
    Exhausted { attempts: u32 },
    /// A fetch failed; polling stops at the first failure.
    Fetch { attempt: u32, error: E },
}

pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    clock: &dyn Clock,
    mut fetch: F,
    is_terminal: P,
) -> Result<Polled<T>, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    for attempt in 1..=policy.max_attempts {
        let value = fetch(attempt)
            .await
            .map_err(|error| PollError::Fetch { attempt, error })?;

        if is_terminal(&value) {
            return Ok(Polled {
                value,
                attempts: attempt,
            });
        }

        tracing::debug!(
            attempt,
            max_attempts = policy.max_attempts,
            interval_ms = policy.interval.as_millis() as u64,
            "Not terminal yet, waiting before next poll"
        );
        clock.sleep(policy.interval).await;
    }

    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
    })
}

/// Poll a job until it finishes and return its download URL.
pub async fn wait_for_job<A>(
    api: &A,
    handle: &JobHandle,
    policy: &PollPolicy,
    clock: &dyn Clock,
) -> WorkflowResult<String>
where
    A: ResizeApi + ?Sized,
{
    let job_id = handle.job_id.as_str();
    let polled = poll_until(
        policy,
        clock,
        move |attempt| {
            tracing::debug!(job_id = %job_id, attempt, "Polling job status");
            api.job_status(job_id)
        },
        JobStatus::is_terminal,
    )
    .await;

    match polled {
        Ok(Polled { value, attempts }) => resolve_terminal(job_id, value, attempts),
        Err(PollError::Exhausted { attempts }) => {
            tracing::warn!(job_id = %job_id, attempts, "Gave up waiting for job");
            Err(WorkflowError::Timeout { attempts })
        }
        Err(PollError::Fetch { error, .. }) => Err(error),
    }
}

fn resolve_terminal(job_id: &str, status: JobStatus, attempts: u32) -> WorkflowResult<String> {
    match status.status {
        JobState::Complete => {
            let url = status.download_url.ok_or_else(|| {
                WorkflowError::Processing("job completed without a download URL".to_string())
            })?;
            tracing::info!(job_id = %job_id, attempts, "Job completed");
            Ok(url)
        }
        JobState::Error => Err(WorkflowError::Processing(format!(
            "job {} reported ERROR",
            job_id
        ))),
        JobState::Canceled => Err(WorkflowError::Processing(format!(
            "job {} was canceled",
            job_id
        ))),
        JobState::Pending => Err(WorkflowError::Processing(format!(
            "job {} returned without reaching a final status",
            job_id
        ))),
    }
}
