//! Retry scheduler.
//!
//! Runs a zero-argument async operation, retrying transient failures with
//! exponential backoff plus jitter. Attempts are strictly sequential and the
//! final failure is returned exactly as the operation produced it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::ports::{InteractionLog, InteractionRecord, LogCategory, RequestContext};

use super::classify::{Classify, FailureClass, FailureShape, classify};
use super::policy::{JitterSource, RetryPolicy, UniformJitter, jittered_delay};

/// What the scheduler does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for `delay`, then run attempt `next_attempt`.
    Retry { delay: Duration, next_attempt: u32 },
    /// Classification is permanent; surface the failure now.
    GiveUpPermanent,
    /// Transient, but the attempt budget is spent.
    GiveUpExhausted,
}

/// Summary of one failed attempt, folded into the next decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// 1-based attempt number.
    pub attempt: u32,
    pub class: FailureClass,
    pub status: Option<u16>,
    pub message: String,
}

impl AttemptOutcome {
    fn observe<E: Classify + fmt::Display>(attempt: u32, failure: &E) -> Self {
        let status = match failure.shape() {
            FailureShape::Status(status) => u16::try_from(status).ok(),
            _ => None,
        };
        Self {
            attempt,
            class: classify(failure),
            status,
            message: failure.to_string(),
        }
    }
}

/// Executes operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    policy: RetryPolicy,
    jitter: Arc<dyn JitterSource>,
    log: Arc<dyn InteractionLog>,
}

impl RetryScheduler {
    /// Create a scheduler with uniformly random jitter.
    pub fn new(policy: RetryPolicy, log: Arc<dyn InteractionLog>) -> Self {
        Self {
            policy,
            jitter: Arc::new(UniformJitter),
            log,
        }
    }

    /// Replace the jitter source.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Decide what follows a failed `attempt` of class `class`.
    pub fn decide(&self, class: FailureClass, attempt: u32) -> RetryDecision {
        if !class.is_transient() {
            return RetryDecision::GiveUpPermanent;
        }
        if attempt >= self.policy.effective_max_attempts() {
            return RetryDecision::GiveUpExhausted;
        }
        RetryDecision::Retry {
            delay: jittered_delay(&self.policy, attempt, self.jitter.as_ref()),
            next_attempt: attempt + 1,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of
    /// attempts.
    ///
    /// Each invocation of `operation` must start a completely fresh call.
    /// `ctx` is used for observability only.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F, ctx: &RequestContext) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let failure = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            path = %ctx.target,
                            attempt,
                            "Upstream call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let outcome = AttemptOutcome::observe(attempt, &failure);
            match self.decide(outcome.class, attempt) {
                RetryDecision::Retry {
                    delay,
                    next_attempt,
                } => {
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(
                        method = %ctx.method,
                        path = %ctx.target,
                        attempt,
                        class = %outcome.class,
                        status = ?outcome.status,
                        delay_ms,
                        "Transient upstream failure, retrying: {}",
                        outcome.message
                    );
                    self.log.record(
                        InteractionRecord::new(LogCategory::Retry, ctx)
                            .with_attempt(attempt)
                            .with_delay_ms(delay_ms)
                            .with_status(outcome.status)
                            .with_message(outcome.message),
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                decision => {
                    let reason = if decision == RetryDecision::GiveUpPermanent {
                        "permanent"
                    } else {
                        "exhausted"
                    };
                    warn!(
                        method = %ctx.method,
                        path = %ctx.target,
                        attempt,
                        class = %outcome.class,
                        status = ?outcome.status,
                        reason,
                        "Upstream call failed: {}",
                        outcome.message
                    );
                    self.log.record(
                        InteractionRecord::new(LogCategory::Failure, ctx)
                            .with_attempt(attempt)
                            .with_status(outcome.status)
                            .with_message(outcome.message),
                    );
                    return Err(failure);
                }
            }
        }
    }
}
