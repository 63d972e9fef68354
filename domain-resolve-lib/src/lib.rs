//! # Domain Resolve Library
//!
//! A fast, bounded-concurrency library for filtering domain lists down to
//! the names that actually resolve via DNS.
//!
//! The pipeline has five stages:
//!
//! 1. **Normalize**: strip schemes, paths, ports and trailing dots, lower-case,
//!    reject junk lines, drop duplicates.
//! 2. **Resolve**: one timed lookup through a pluggable [`Resolve`] backend.
//! 3. **Retry**: bounded retries with capped exponential backoff.
//! 4. **Pool**: a fixed number of async workers draining a shared queue.
//! 5. **Aggregate**: keep resolved names, sorted and unique.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_resolve_lib::{DomainValidator, NoProgress, RunConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::default()
//!         .with_workers(20)
//!         .with_timeout(Duration::from_secs(3));
//!     let validator = DomainValidator::with_config(config);
//!
//!     let report = validator
//!         .validate_lines(["github.com", "https://google.com/search"], &NoProgress)
//!         .await?;
//!     print!("{}", report.valid.render());
//!     Ok(())
//! }
//! ```

// Re-export main public API types and functions
// This makes them available as domain_resolve_lib::TypeName
pub use aggregate::{aggregate, ValidDomainSet};
pub use checker::{DomainValidator, RunReport};
pub use config::{load_env_config, ConfigManager, DefaultsConfig, EnvConfig, FileConfig};
pub use error::{DomainResolveError, ErrorKind};
pub use io::{read_input_lines, write_output};
pub use normalize::{normalize, normalize_lines, NormalizedInput, RejectedLine, Rejection};
pub use pool::{NoProgress, ProgressReporter, WorkerPool};
pub use resolver::{resolve, resolver_for, AttemptResult, HickoryResolver, Lookup, Resolve, SystemResolver};
pub use retry::{resolve_with_retry, Backoff, RetryPolicy};
pub use types::{
    timeout_from_secs, DomainTask, ResolutionOutcome, ResolverBackend, RunConfig, RunSummary,
    MAX_DOMAIN_LENGTH, MAX_WORKERS, MIN_WORKERS,
};

// Public modules
pub mod normalize;
pub mod resolver;

// Internal modules - their public items are re-exported above
mod aggregate;
mod checker;
mod config;
mod error;
mod io;
mod pool;
mod retry;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainResolveError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
