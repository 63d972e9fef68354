//! Main domain validator implementation.
//!
//! This module provides the `DomainValidator` struct that wires the pipeline
//! together: normalize and dedup the input, resolve every unique name
//! through the bounded worker pool, then aggregate the survivors.

use crate::aggregate::{aggregate, ValidDomainSet};
use crate::error::{DomainResolveError, ErrorKind};
use crate::normalize::{normalize, normalize_lines, NormalizedInput, RejectedLine, Rejection};
use crate::pool::{ProgressReporter, WorkerPool};
use crate::resolver::{resolver_for, Resolve};
use crate::retry::resolve_with_retry;
use crate::types::{DomainTask, ResolutionOutcome, RunConfig, RunSummary};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Validates domain lists against DNS.
///
/// # Example
///
/// ```rust,no_run
/// use domain_resolve_lib::{DomainValidator, NoProgress};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let validator = DomainValidator::new();
///     let lines = vec!["https://github.com/rust-lang", "# comment", "google.com"];
///     let report = validator.validate_lines(lines, &NoProgress).await?;
///     for domain in report.valid.iter() {
///         println!("{}", domain);
///     }
///     Ok(())
/// }
/// ```
pub struct DomainValidator {
    config: RunConfig,
    resolver: Arc<dyn Resolve>,
}

impl DomainValidator {
    /// Create a validator with default settings and the hickory backend.
    ///
    /// Defaults: 5 second timeout, 50 workers, 2 retries.
    pub fn new() -> Self {
        Self::with_config(RunConfig::default())
    }

    /// Create a validator whose backend is chosen by `config.resolver`.
    pub fn with_config(config: RunConfig) -> Self {
        let resolver = resolver_for(config.resolver, config.timeout);
        Self { config, resolver }
    }

    /// Create a validator around a caller-supplied resolver.
    pub fn with_resolver(config: RunConfig, resolver: Arc<dyn Resolve>) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Normalize and resolve a single name, retries included.
    pub async fn resolve_domain(&self, domain: &str) -> Result<ResolutionOutcome, Rejection> {
        let task = normalize(domain)?;
        Ok(resolve_with_retry(
            self.resolver.as_ref(),
            &task.normalized,
            self.config.timeout,
            &self.config.retry_policy(),
        )
        .await)
    }

    /// Resolve already-normalized tasks.
    ///
    /// Tasks are expected to be unique; duplicates are still resolved but
    /// collapse to one entry in `valid`.
    pub async fn run(
        &self,
        tasks: Vec<DomainTask>,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport, DomainResolveError> {
        let total_lines = tasks.len();
        let input = NormalizedInput {
            tasks,
            rejected: Vec::new(),
            duplicates: 0,
            total_lines,
        };
        self.execute(input, progress).await
    }

    /// Full pipeline over raw input lines.
    pub async fn validate_lines<I, S>(
        &self,
        lines: I,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport, DomainResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let input = normalize_lines(lines);
        tracing::debug!(
            lines = input.total_lines,
            unique = input.tasks.len(),
            duplicates = input.duplicates,
            rejected = input.rejected.len(),
            "normalized input"
        );
        self.execute(input, progress).await
    }

    async fn execute(
        &self,
        input: NormalizedInput,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport, DomainResolveError> {
        self.config.validate()?;

        let NormalizedInput {
            tasks,
            rejected,
            duplicates,
            total_lines,
        } = input;

        tracing::info!(
            domains = tasks.len(),
            workers = self.config.max_workers,
            retries = self.config.max_retries,
            timeout = ?self.config.timeout,
            resolver = %self.config.resolver,
            "starting resolution run"
        );

        let started = Instant::now();
        let outcomes = WorkerPool::new(self.config.max_workers)
            .run(
                Arc::clone(&self.resolver),
                tasks,
                self.config.timeout,
                self.config.retry_policy(),
                progress,
            )
            .await?;
        let valid = aggregate(&outcomes);
        let elapsed = started.elapsed();

        tracing::info!(
            checked = outcomes.len(),
            resolved = valid.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "resolution run finished"
        );

        Ok(RunReport {
            valid,
            outcomes,
            rejected,
            duplicates,
            total_lines,
            elapsed,
        })
    }
}

impl Default for DomainValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Sorted, unique domains that resolved
    pub valid: ValidDomainSet,
    /// One outcome per unique task, in completion order
    pub outcomes: Vec<ResolutionOutcome>,
    /// Lines the normalizer turned away (blank lines and comments excluded)
    pub rejected: Vec<RejectedLine>,
    /// Lines dropped as repeats of an earlier normalized name
    pub duplicates: usize,
    pub total_lines: usize,
    /// Wall time of the resolution phase
    pub elapsed: Duration,
}

impl RunReport {
    /// Counters for display or JSON output.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total_lines: self.total_lines,
            checked: self.outcomes.len(),
            resolved: self.valid.len(),
            rejected: self.rejected.len(),
            duplicates: self.duplicates,
            elapsed_ms: self.elapsed.as_millis(),
            ..RunSummary::default()
        };

        for outcome in self.outcomes.iter().filter(|o| !o.resolved) {
            summary.failed += 1;
            match outcome.last_error {
                Some(ErrorKind::Timeout) => summary.timeouts += 1,
                Some(ErrorKind::NotFound) => summary.not_found += 1,
                Some(ErrorKind::Transient) | Some(ErrorKind::Internal) | None => {
                    summary.transient += 1
                }
            }
        }

        summary
    }
}
