//! Step supervision for the evaluation pipeline.
//!
//! The evaluation steps after scoring are individually fallible and are never
//! wrapped in a cross-step transaction. Each one runs under a bounded retry
//! policy: transient store failures are retried with exponential backoff, and
//! a step that exhausts its budget (or fails fatally) is surfaced as a dead
//! letter so the evaluation can continue with the remaining steps.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::errors::Result;

/// Bounded retry policy applied to every side-effecting evaluation step.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

/// Terminal outcome of one supervised step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed {
        attempts: u32,
    },
    /// The step gave up; the orchestrator records a dead-letter entry and
    /// moves on.
    DeadLettered {
        reason: String,
        attempts: u32,
    },
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails fatally, or runs out of attempts.
    /// Backoff doubles per attempt starting from `base_delay`.
    pub async fn run<F, Fut>(&self, step: &'static str, mut op: F) -> StepOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(()) => return StepOutcome::Completed { attempts: attempt },
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.pow(attempt - 1);
                    warn!(
                        "Step {} failed (attempt {}/{}), retrying in {:?}: {}",
                        step, attempt, self.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Step {} gave up after {} attempt(s): {}", step, attempt, e);
                    return StepOutcome::DeadLettered {
                        reason: e.to_string(),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FraudEngineError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn completes_first_try() {
        let outcome = fast_policy().run("noop", || async { Ok(()) }).await;
        assert_eq!(outcome, StepOutcome::Completed { attempts: 1 });
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let outcome = fast_policy()
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FraudEngineError::Store("transient".to_string()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert_eq!(outcome, StepOutcome::Completed { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn dead_letters_after_exhausting_attempts() {
        let calls = AtomicU32::new(0);
        let outcome = fast_policy()
            .run("down", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FraudEngineError::Store("still down".to_string())) }
            })
            .await;
        match outcome {
            StepOutcome::DeadLettered { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected dead letter, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let outcome = fast_policy()
            .run("invalid", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FraudEngineError::Validation("bad payload".to_string())) }
            })
            .await;
        match outcome {
            StepOutcome::DeadLettered { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected dead letter, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
