//! Terminal display logic for the domain-resolve CLI.
//!
//! Progress is a single redrawn line on stderr so stdout stays clean for
//! the summary or `--json`. Uses only the `console` crate.

use console::{style, Term};
use domain_resolve_lib::{ErrorKind, ProgressReporter, ResolutionOutcome, RunSummary};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const BAR_WIDTH: usize = 30;

// ── Progress ─────────────────────────────────────────────────────────────────

/// Live `[====    ] 12/50 (24%)` line on stderr.
pub struct ProgressLine {
    term: Term,
    last_percent: AtomicUsize,
}

impl ProgressLine {
    /// A progress line on stderr, or `None` when stderr is not a terminal.
    pub fn stderr() -> Option<Self> {
        let term = Term::stderr();
        term.is_term().then(|| Self {
            term,
            last_percent: AtomicUsize::new(usize::MAX),
        })
    }

    /// Erase the progress line.
    pub fn finish(&self) {
        let _ = self.term.clear_line();
    }
}

impl ProgressReporter for ProgressLine {
    fn report(&self, completed: usize, total: usize) {
        let pct = percent(completed, total);
        // Redraw once per percentage point, and always on the final update.
        if self.last_percent.swap(pct, Ordering::Relaxed) == pct && completed != total {
            return;
        }

        let line = format!(
            "{} {} {}/{} ({}%)",
            style("Resolving").cyan().bold(),
            bar(completed, total, BAR_WIDTH),
            completed,
            total,
            pct
        );
        let _ = self.term.clear_line();
        let _ = self.term.write_str(&line);
    }
}

fn percent(completed: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        completed.min(total) * 100 / total
    }
}

fn bar(completed: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 {
        width
    } else {
        completed.min(total) * width / total
    };
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary with colored counts.
pub fn print_summary(summary: &RunSummary, output: &Path) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} domain{} checked in {}  {}  {}  {}  {}",
        style(summary.checked).bold(),
        plural(summary.checked),
        format_elapsed(Duration::from_millis(summary.elapsed_ms as u64)),
        style("|").dim(),
        style(format!("{} resolved", summary.resolved)).green(),
        style("|").dim(),
        style(format!("{} failed", summary.failed)).red(),
    );

    if summary.rejected > 0 || summary.duplicates > 0 {
        println!(
            "  {}",
            style(format!(
                "{} line{} rejected, {} duplicate{} skipped",
                summary.rejected,
                plural(summary.rejected),
                summary.duplicates,
                plural(summary.duplicates)
            ))
            .dim()
        );
    }

    println!("  Results saved to {}", style(output.display()).cyan());
}

/// Print the domains that did not resolve, grouped by why.
pub fn print_failures(outcomes: &[ResolutionOutcome]) {
    let groups = [
        (ErrorKind::Timeout, "timed out"),
        (ErrorKind::NotFound, "not found"),
        (ErrorKind::Transient, "lookup error"),
        (ErrorKind::Internal, "internal error"),
    ];

    let any_failed = outcomes.iter().any(|o| !o.resolved);
    if !any_failed {
        return;
    }

    println!("  {}", style("Domains that did not resolve:").yellow());
    for (kind, label) in groups {
        let mut domains: Vec<&str> = outcomes
            .iter()
            .filter(|o| !o.resolved && o.last_error == Some(kind))
            .map(|o| o.domain.as_str())
            .collect();
        if domains.is_empty() {
            continue;
        }
        domains.sort_unstable();

        println!(
            "  {} {} {}: {}",
            style("•").dim(),
            domains.len(),
            label,
            format_list(&domains, 5),
        );
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn format_list(domains: &[&str], max_show: usize) -> String {
    if domains.len() <= max_show {
        domains.join(", ")
    } else {
        format!(
            "{}, ... and {} more",
            domains[..max_show].join(", "),
            domains.len() - max_show
        )
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
