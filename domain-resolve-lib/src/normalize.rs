//! Input line normalization.
//!
//! Turns raw lines (bare hosts, URLs, comments, junk) into canonical,
//! lower-cased host names ready for resolution, or a [`Rejection`].
//! Only basic length/charset sanity is enforced here; whether a name is
//! real is the resolver's job.

use crate::types::{DomainTask, MAX_DOMAIN_LENGTH};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("scheme pattern is valid")
});

/// Why a line was not turned into a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Blank or whitespace-only line
    Empty,
    /// Line starts with `#`
    Comment,
    /// A scheme with nothing usable after it (`https://`, `http:///path`)
    SchemeOnly,
    /// Non-blank line with no host in it (`/path`, `:8080`, `.`)
    NoHost,
    /// Host longer than 253 characters
    TooLong { length: usize },
    /// Whitespace inside the host portion
    Whitespace,
    /// A character outside `[a-z0-9.-]`
    InvalidCharacter { ch: char },
    /// Consecutive, leading dots (`bad..name`, `.example.com`)
    EmptyLabel,
}

impl Rejection {
    /// Blank lines and comments are expected in input files and not worth
    /// a diagnostic.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Empty | Self::Comment)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "empty line"),
            Rejection::Comment => write!(f, "comment"),
            Rejection::SchemeOnly => write!(f, "scheme without host"),
            Rejection::NoHost => write!(f, "no host"),
            Rejection::TooLong { length } => {
                write!(f, "domain too long ({} > {} chars)", length, MAX_DOMAIN_LENGTH)
            }
            Rejection::Whitespace => write!(f, "contains whitespace"),
            Rejection::InvalidCharacter { ch } => write!(f, "invalid character {:?}", ch),
            Rejection::EmptyLabel => write!(f, "empty label"),
        }
    }
}

/// Normalize one input line.
///
/// # Examples
///
/// ```
/// use domain_resolve_lib::normalize;
///
/// let task = normalize("https://Example.com/path").unwrap();
/// assert_eq!(task.normalized, "example.com");
/// assert!(normalize("# comment").is_err());
/// ```
pub fn normalize(line: &str) -> Result<DomainTask, Rejection> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }
    if trimmed.starts_with('#') {
        return Err(Rejection::Comment);
    }

    let (rest, had_scheme) = match SCHEME_RE.find(trimmed) {
        Some(m) => (&trimmed[m.end()..], true),
        None => (trimmed, false),
    };

    // Authority ends at the first path, query or fragment delimiter.
    let authority = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    let host = strip_port(strip_userinfo(authority));

    let mut host = host.to_lowercase();
    if host.ends_with('.') {
        host.pop();
    }

    if host.is_empty() {
        return Err(if had_scheme {
            Rejection::SchemeOnly
        } else {
            Rejection::NoHost
        });
    }
    let length = host.chars().count();
    if length > MAX_DOMAIN_LENGTH {
        return Err(Rejection::TooLong { length });
    }
    if host.chars().any(char::is_whitespace) {
        return Err(Rejection::Whitespace);
    }
    if let Some(ch) = host
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '-'))
    {
        return Err(Rejection::InvalidCharacter { ch });
    }
    if host.split('.').any(str::is_empty) {
        return Err(Rejection::EmptyLabel);
    }

    Ok(DomainTask::new(line, host))
}

fn strip_userinfo(authority: &str) -> &str {
    match authority.rsplit_once('@') {
        Some((_, host)) => host,
        None => authority,
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// A line the normalizer refused, with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number
    pub line_number: usize,
    pub line: String,
    pub reason: Rejection,
}

/// The deduplicated task list for a whole input, plus what was dropped.
#[derive(Debug, Clone, Default)]
pub struct NormalizedInput {
    /// Unique tasks in first-seen order
    pub tasks: Vec<DomainTask>,
    /// Non-silent rejections (blank lines and comments are not recorded)
    pub rejected: Vec<RejectedLine>,
    /// Valid lines whose normalized form had already been seen
    pub duplicates: usize,
    /// Every line read, including blanks and comments
    pub total_lines: usize,
}

/// Normalize every line of an input and drop duplicates before scheduling.
pub fn normalize_lines<I, S>(lines: I) -> NormalizedInput
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut input = NormalizedInput::default();
    let mut seen = HashSet::new();

    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        input.total_lines += 1;

        match normalize(line) {
            Ok(task) => {
                if seen.insert(task.normalized.clone()) {
                    input.tasks.push(task);
                } else {
                    input.duplicates += 1;
                }
            }
            Err(reason) if reason.is_silent() => {}
            Err(reason) => {
                tracing::debug!(line = idx + 1, input = %line.trim(), %reason, "rejected input line");
                input.rejected.push(RejectedLine {
                    line_number: idx + 1,
                    line: line.to_string(),
                    reason,
                });
            }
        }
    }

    if input.duplicates > 0 {
        tracing::debug!(duplicates = input.duplicates, "removed duplicate domains");
    }

    input
}
