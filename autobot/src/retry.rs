use crate::errors::AutomationError;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded-retry settings shared by every retried interaction of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryBudget {
    pub max_attempts: u32,
    /// Pause between two attempts
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryBudget {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Run `action` until it succeeds or the budget is spent.
///
/// The closure receives the 1-based attempt number. Every failure is logged with
/// that number; the error of the last attempt is returned untouched. Errors that
/// are not retryable end the loop immediately. Resetting frame context before a
/// new attempt is the action's own job.
pub async fn run_with_retry<T, F, Fut>(
    label: &str,
    budget: &RetryBudget,
    mut action: F,
) -> Result<T, AutomationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AutomationError>>,
{
    let max_attempts = budget.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        debug!(action = label, attempt, max_attempts, "Running step");
        match action(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(action = label, attempt, "Step succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                warn!(action = label, attempt, error = %e, "Step failed with a non-retryable error");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    action = label,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Step attempt failed"
                );
                if attempt >= max_attempts {
                    return Err(e);
                }
            }
        }
        attempt += 1;
        tokio::time::sleep(budget.delay).await;
    }
}
