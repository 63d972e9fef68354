//! Final result aggregation.
//!
//! Pure functions only: no I/O, no clocks, no logging. The output order is
//! imposed here, so worker completion order never leaks into results.

use crate::types::ResolutionOutcome;
use std::collections::BTreeSet;

/// Sorted, duplicate-free list of domains that resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidDomainSet {
    domains: Vec<String>,
}

impl ValidDomainSet {
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains
            .binary_search_by(|d| d.as_str().cmp(domain))
            .is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.domains
    }

    pub fn into_vec(self) -> Vec<String> {
        self.domains
    }

    /// Output file body: one domain per line, each newline-terminated.
    pub fn render(&self) -> String {
        let mut body = String::with_capacity(self.domains.iter().map(|d| d.len() + 1).sum());
        for domain in &self.domains {
            body.push_str(domain);
            body.push('\n');
        }
        body
    }
}

impl<'a> IntoIterator for &'a ValidDomainSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.domains.iter()
    }
}

/// Keep resolved domains, drop duplicates, sort ascending (byte order).
pub fn aggregate<'a, I>(outcomes: I) -> ValidDomainSet
where
    I: IntoIterator<Item = &'a ResolutionOutcome>,
{
    let domains: BTreeSet<&str> = outcomes
        .into_iter()
        .filter(|o| o.resolved)
        .map(|o| o.domain.as_str())
        .collect();

    ValidDomainSet {
        domains: domains.into_iter().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ok(d: &str) -> ResolutionOutcome {
        ResolutionOutcome::success(d, 1)
    }

    fn failed(d: &str) -> ResolutionOutcome {
        ResolutionOutcome::failure(d, 3, ErrorKind::Timeout)
    }

    #[test]
    fn test_filters_dedups_and_sorts() {
        let outcomes = vec![
            ok("zeta.com"),
            failed("down.com"),
            ok("alpha.com"),
            ok("mid.org"),
            ok("alpha.com"),
        ];

        let set = aggregate(&outcomes);
        assert_eq!(set.as_slice(), ["alpha.com", "mid.org", "zeta.com"]);
        assert!(set.contains("mid.org"));
        assert!(!set.contains("down.com"));
    }

    #[test]
    fn test_failed_duplicate_does_not_hide_success() {
        let outcomes = vec![failed("a.com"), ok("a.com")];
        assert_eq!(aggregate(&outcomes).as_slice(), ["a.com"]);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let mut outcomes = vec![ok("c.io"), ok("a.io"), failed("x.io"), ok("b.io")];
        let first = aggregate(&outcomes);
        let second = aggregate(&outcomes);
        assert_eq!(first, second);

        outcomes.reverse();
        assert_eq!(aggregate(&outcomes), first);
    }

    #[test]
    fn test_lexicographic_byte_order() {
        let outcomes = vec![ok("b.com"), ok("a-b.com"), ok("a.com"), ok("1.com")];
        assert_eq!(
            aggregate(&outcomes).as_slice(),
            ["1.com", "a-b.com", "a.com", "b.com"]
        );
    }

    #[test]
    fn test_render() {
        let outcomes = vec![ok("google.com"), ok("github.com")];
        assert_eq!(aggregate(&outcomes).render(), "github.com\ngoogle.com\n");
        assert_eq!(aggregate(&Vec::<ResolutionOutcome>::new()).render(), "");
    }
}
