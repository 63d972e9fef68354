//! Bounded retry around single resolution attempts.
//!
//! Each task walks an explicit state machine:
//!
//! ```text
//! Pending -> Attempting(1) -> Resolved
//!                          -> RetryPending -> Attempting(n+1) -> ...
//!                          -> Failed            (attempts exhausted)
//! ```
//!
//! Retries run sequentially inside the worker slot that already holds the
//! task, so they never take extra concurrency and never requeue.

use crate::error::ErrorKind;
use crate::resolver::{resolve, Resolve};
use crate::types::ResolutionOutcome;
use std::time::Duration;
use tokio::time::Instant;

/// Delay applied between attempts: `base * 2^(retry - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    /// Retry immediately.
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Doubling delay starting at `base`, never above `max`.
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.base.is_zero() || retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(100), Duration::from_millis(500))
    }
}

/// How many times, and how patiently, a failed lookup is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Total attempts allowed: the first one plus every retry.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Where a single task is in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptState {
    Pending,
    Attempting { attempt: u32 },
    RetryPending { attempts: u32, last_error: ErrorKind },
    Resolved { attempts: u32 },
    Failed { attempts: u32, last_error: ErrorKind },
}

/// Resolve `domain`, retrying per `policy`. Never fails: every failure mode
/// ends up in the returned outcome.
pub async fn resolve_with_retry(
    resolver: &dyn Resolve,
    domain: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> ResolutionOutcome {
    let started = Instant::now();
    let max_attempts = policy.max_attempts();
    let mut state = AttemptState::Pending;

    loop {
        state = match state {
            AttemptState::Pending => AttemptState::Attempting { attempt: 1 },

            AttemptState::Attempting { attempt } => {
                match resolve(resolver, domain, timeout).await {
                    Ok(()) => AttemptState::Resolved { attempts: attempt },
                    Err(kind) if attempt < max_attempts => AttemptState::RetryPending {
                        attempts: attempt,
                        last_error: kind,
                    },
                    Err(kind) => AttemptState::Failed {
                        attempts: attempt,
                        last_error: kind,
                    },
                }
            }

            AttemptState::RetryPending {
                attempts,
                last_error,
            } => {
                let delay = policy.backoff.delay_for(attempts);
                tracing::trace!(domain = %domain, attempts, error = %last_error, ?delay, "attempt failed, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                AttemptState::Attempting {
                    attempt: attempts + 1,
                }
            }

            AttemptState::Resolved { attempts } => {
                return ResolutionOutcome::success(domain, attempts)
                    .with_duration(started.elapsed());
            }

            AttemptState::Failed {
                attempts,
                last_error,
            } => {
                tracing::debug!(domain = %domain, attempts, error = %last_error, "domain did not resolve");
                return ResolutionOutcome::failure(domain, attempts, last_error)
                    .with_duration(started.elapsed());
            }
        };
    }
}
