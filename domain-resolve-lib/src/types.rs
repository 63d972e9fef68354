//! Core data types for domain resolution runs.
//!
//! This module defines the value types that flow through the engine:
//! tasks produced by the normalizer, outcomes produced by the worker pool,
//! the run configuration and the serializable run summary.

use crate::error::{DomainResolveError, ErrorKind};
use crate::retry::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lower bound for the worker count.
pub const MIN_WORKERS: usize = 1;

/// Upper bound for the worker count.
pub const MAX_WORKERS: usize = 200;

/// Longest host name accepted, in characters.
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// One normalized candidate host name awaiting resolution.
///
/// Identity is the normalized form: two tasks with the same `normalized`
/// value are duplicates regardless of how their raw lines looked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainTask {
    /// The input line as read (before trimming)
    pub raw: String,

    /// Lower-cased host, no scheme, path, port or trailing root dot
    pub normalized: String,
}

impl DomainTask {
    pub fn new<R: Into<String>, N: Into<String>>(raw: R, normalized: N) -> Self {
        Self {
            raw: raw.into(),
            normalized: normalized.into(),
        }
    }
}

/// The recorded result of checking one domain.
///
/// Produced exactly once per unique task. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// The normalized domain that was checked
    pub domain: String,

    /// Whether any attempt resolved to at least one address
    pub resolved: bool,

    /// Number of attempts actually made (at least 1)
    pub attempts: u32,

    /// Classification of the final failure; `None` when resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorKind>,

    /// Wall time spent on this domain, retries and backoff included
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_duration: Option<Duration>,
}

impl ResolutionOutcome {
    /// Outcome for a domain that resolved on attempt `attempts`.
    pub fn success<D: Into<String>>(domain: D, attempts: u32) -> Self {
        Self {
            domain: domain.into(),
            resolved: true,
            attempts,
            last_error: None,
            check_duration: None,
        }
    }

    /// Outcome for a domain whose attempts were exhausted.
    pub fn failure<D: Into<String>>(domain: D, attempts: u32, kind: ErrorKind) -> Self {
        Self {
            domain: domain.into(),
            resolved: false,
            attempts,
            last_error: Some(kind),
            check_duration: None,
        }
    }

    pub(crate) fn with_duration(mut self, duration: Duration) -> Self {
        self.check_duration = Some(duration);
        self
    }
}

/// Which name-resolution backend performs lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverBackend {
    /// Async stub resolver using the system's nameserver configuration
    #[default]
    Hickory,

    /// The operating system resolver (getaddrinfo), honours /etc/hosts and NSS
    System,
}

impl fmt::Display for ResolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverBackend::Hickory => write!(f, "hickory"),
            ResolverBackend::System => write!(f, "system"),
        }
    }
}

impl FromStr for ResolverBackend {
    type Err = DomainResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hickory" | "dns" => Ok(Self::Hickory),
            "system" | "os" | "gai" => Ok(Self::System),
            other => Err(DomainResolveError::config(format!(
                "Unknown resolver '{}', expected 'hickory' or 'system'",
                other
            ))),
        }
    }
}

/// Immutable configuration for one run.
///
/// Built once at startup (defaults, then config file, environment and CLI
/// flags) and passed by reference into the pool. Never mutated mid-run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Per-attempt resolution timeout
    /// Default: 5 seconds
    pub timeout: Duration,

    /// Maximum number of lookups in flight at once
    /// Default: 50, Range: 1-200
    pub max_workers: usize,

    /// Retries after the first failed attempt
    /// Default: 2 (so up to 3 attempts)
    pub max_retries: u32,

    /// Emit per-line and per-domain diagnostics
    pub verbose: bool,

    /// Lookup backend
    pub resolver: ResolverBackend,

    /// Delay before the first retry; doubles per retry
    /// Default: 100 ms
    pub backoff_base: Duration,

    /// Cap on the retry delay
    /// Default: 500 ms
    pub backoff_max: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_workers: 50,
            max_retries: 2,
            verbose: false,
            resolver: ResolverBackend::Hickory,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(500),
        }
    }
}

impl RunConfig {
    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the worker count, clamped to 1-200.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.clamp(MIN_WORKERS, MAX_WORKERS);
        self
    }

    /// Set how many times a failed lookup is retried.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Enable or disable verbose diagnostics.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Choose the lookup backend.
    pub fn with_resolver(mut self, resolver: ResolverBackend) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the retry backoff. `Duration::ZERO` for `base` disables it.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// The retry policy this configuration describes.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Backoff::exponential(self.backoff_base, self.backoff_max),
        )
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), DomainResolveError> {
        if self.timeout.is_zero() {
            return Err(DomainResolveError::config("Timeout must be positive"));
        }
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.max_workers) {
            return Err(DomainResolveError::config(format!(
                "Workers must be between {} and {}",
                MIN_WORKERS, MAX_WORKERS
            )));
        }
        if self.backoff_max < self.backoff_base {
            return Err(DomainResolveError::config(
                "Backoff cap must not be smaller than the base delay",
            ));
        }
        Ok(())
    }
}

/// Convert a user-facing timeout in seconds into a [`Duration`].
///
/// Rejects zero, negative, NaN and infinite values.
pub fn timeout_from_secs(secs: f64) -> Result<Duration, DomainResolveError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(DomainResolveError::config("Timeout must be positive"));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| DomainResolveError::config(format!("Invalid timeout {}: {}", secs, e)))
}

/// Counters describing a finished run, suitable for display or JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Lines read from the input
    pub total_lines: usize,
    /// Unique domains handed to the pool
    pub checked: usize,
    /// Domains that resolved
    pub resolved: usize,
    /// Domains whose attempts were exhausted
    pub failed: usize,
    /// Non-blank, non-comment lines rejected by the normalizer
    pub rejected: usize,
    /// Lines dropped because their normalized form was already seen
    pub duplicates: usize,
    /// Failures by final classification
    pub timeouts: usize,
    pub not_found: usize,
    pub transient: usize,
    /// Wall time of the resolution phase
    pub elapsed_ms: u128,
}
