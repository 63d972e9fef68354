//! Error handling for domain resolution runs.
//!
//! Two layers of failure exist and they never mix:
//!
//! - [`DomainResolveError`] is fatal to a whole run (bad input file, output
//!   path that cannot be written, a worker pool that cannot make progress).
//! - [`ErrorKind`] classifies a single failed lookup. It is data carried in a
//!   [`ResolutionOutcome`](crate::ResolutionOutcome) and never propagates
//!   past the retry layer.
//!
//! Per-line normalization rejections live in [`crate::normalize::Rejection`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for run-level failures.
#[derive(Debug, Clone)]
pub enum DomainResolveError {
    /// Input file missing, unreadable, or not valid UTF-8
    InputError { path: String, message: String },

    /// Output path or its parent directories could not be created or written
    OutputError { path: String, message: String },

    /// Worker pool failure (no runtime, lost worker, outcome accounting mismatch)
    RunError { message: String },

    /// Configuration errors (invalid settings, unparsable config file, etc.)
    ConfigError { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DomainResolveError {
    /// Create a new input error.
    pub fn input<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::InputError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new output error.
    pub fn output<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::OutputError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new run error.
    pub fn run<M: Into<String>>(message: M) -> Self {
        Self::RunError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

impl fmt::Display for DomainResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputError { path, message } => {
                write!(f, "Input file '{}': {}", path, message)
            }
            Self::OutputError { path, message } => {
                write!(f, "Output file '{}': {}", path, message)
            }
            Self::RunError { message } => write!(f, "Run failed: {}", message),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for DomainResolveError {}

impl From<std::io::Error> for DomainResolveError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<serde_json::Error> for DomainResolveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

/// Classification of a single failed resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The attempt did not finish before the per-attempt deadline
    Timeout,

    /// The name does not exist or has no address records
    NotFound,

    /// Resolver unreachable, SERVFAIL, refused, or any other lookup error
    Transient,

    /// The lookup task panicked; recorded so the pool keeps its accounting
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Transient => write!(f, "transient failure"),
            ErrorKind::Internal => write!(f, "internal failure"),
        }
    }
}
