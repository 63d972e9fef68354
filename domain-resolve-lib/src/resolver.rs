//! Single-attempt name resolution.
//!
//! The [`Resolve`] trait is the seam between the engine and the network.
//! Two implementations ship with the crate:
//!
//! - [`HickoryResolver`]: fully async stub resolver (`hickory-resolver`)
//!   configured from the system's resolv.conf. Default.
//! - [`SystemResolver`]: the OS resolver via `tokio::net::lookup_host`,
//!   which honours `/etc/hosts` and NSS the way `getaddrinfo` does.
//!
//! [`resolve`] bounds one lookup by a deadline and collapses every failure
//! mode into an [`ErrorKind`]. Nothing here returns a run-level error.

use crate::error::ErrorKind;
use crate::types::ResolverBackend;
use futures_util::FutureExt;
use hickory_resolver::config::{LookupIpStrategy, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Future returned by a lookup: the number of addresses found, or why none were.
pub type Lookup = Pin<Box<dyn Future<Output = Result<usize, ErrorKind>> + Send>>;

/// Result of one timed resolution attempt.
pub type AttemptResult = Result<(), ErrorKind>;

/// A name-resolution backend.
///
/// Implementations must be cheap to call concurrently through `&self`;
/// the worker pool shares one instance across every worker.
pub trait Resolve: Send + Sync {
    /// Look up address records for `name`.
    ///
    /// Implementations do not need their own deadline; [`resolve`] applies it.
    fn lookup(&self, name: &str) -> Lookup;
}

/// Perform one resolution attempt bounded by `timeout`.
///
/// A lookup that overruns is dropped (and with it any in-flight query),
/// so the caller never waits longer than `timeout`. A lookup that panics,
/// either while building its future or while it is polled, is reported as
/// [`ErrorKind::Internal`] instead of unwinding into the worker.
pub async fn resolve(resolver: &dyn Resolve, domain: &str, timeout: Duration) -> AttemptResult {
    let lookup = AssertUnwindSafe(async { resolver.lookup(domain).await }).catch_unwind();

    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(Ok(0))) => Err(ErrorKind::NotFound),
        Ok(Ok(Ok(_))) => Ok(()),
        Ok(Ok(Err(kind))) => Err(kind),
        Ok(Err(_panic)) => {
            tracing::error!(domain = %domain, "resolver panicked during lookup");
            Err(ErrorKind::Internal)
        }
        Err(_) => Err(ErrorKind::Timeout),
    }
}

/// Build the resolver selected by `backend`.
pub fn resolver_for(backend: ResolverBackend, timeout: Duration) -> Arc<dyn Resolve> {
    match backend {
        ResolverBackend::Hickory => Arc::new(HickoryResolver::with_timeout(timeout)),
        ResolverBackend::System => Arc::new(SystemResolver::new()),
    }
}

/// Async DNS resolver backed by hickory-dns.
///
/// Reads the system nameserver configuration when available and falls back
/// to hickory's defaults otherwise. Hickory's own retries are disabled:
/// retry policy belongs to [`crate::retry`].
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    /// Create a resolver with hickory's default per-query timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Create a resolver whose per-query timeout matches the attempt deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut builder = match TokioResolver::builder_tokio() {
            Ok(builder) => {
                tracing::debug!("Using system DNS configuration");
                builder
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to read system DNS config, using defaults"
                );
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }
        };

        let opts = builder.options_mut();
        opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            resolver: builder.build(),
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for HickoryResolver {
    fn lookup(&self, name: &str) -> Lookup {
        let resolver = self.resolver.clone();
        let domain = name.to_string();
        Box::pin(async move {
            match resolver.lookup_ip(domain.as_str()).await {
                Ok(lookup) => Ok(lookup.iter().count()),
                Err(e) if e.is_nx_domain() || e.is_no_records_found() => {
                    tracing::trace!(domain = %domain, error = %e, "no such name");
                    Err(ErrorKind::NotFound)
                }
                Err(e) => {
                    tracing::trace!(domain = %domain, error = %e, "hickory-dns lookup failed");
                    Err(ErrorKind::Transient)
                }
            }
        })
    }
}

/// System resolver using `getaddrinfo` on tokio's blocking pool.
///
/// The blocking call itself cannot be interrupted, but [`resolve`] stops
/// waiting for it at the deadline, so no worker is held past its timeout.
#[derive(Clone, Debug, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for SystemResolver {
    fn lookup(&self, name: &str) -> Lookup {
        let target = format!("{}:0", name);
        Box::pin(async move {
            match tokio::net::lookup_host(target.as_str()).await {
                Ok(addrs) => Ok(addrs.count()),
                Err(e) => {
                    tracing::trace!(target = %target, error = %e, "getaddrinfo failed");
                    Err(classify_gai_error(&e.to_string()))
                }
            }
        })
    }
}

/// Map a getaddrinfo error message onto an [`ErrorKind`].
///
/// The std/tokio error only carries the `gai_strerror` text, so the
/// classification works on that text.
fn classify_gai_error(message: &str) -> ErrorKind {
    let msg = message.to_lowercase();

    if msg.contains("not known")
        || msg.contains("no address associated")
        || msg.contains("no such host")
        || msg.contains("non-recoverable")
    {
        ErrorKind::NotFound
    } else if msg.contains("timed out") || msg.contains("timeout") {
        ErrorKind::Timeout
    } else {
        ErrorKind::Transient
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted resolvers shared by the crate's unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Plays back a fixed script of results per call, then repeats the last one.
    pub struct ScriptedResolver {
        script: Vec<Result<usize, ErrorKind>>,
        calls: AtomicUsize,
    }

    impl ScriptedResolver {
        pub fn new(script: Vec<Result<usize, ErrorKind>>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn always(result: Result<usize, ErrorKind>) -> Self {
            Self::new(vec![result])
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Resolve for ScriptedResolver {
        fn lookup(&self, _name: &str) -> Lookup {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.script[n.min(self.script.len() - 1)];
            Box::pin(async move { result })
        }
    }

    /// Resolves names from a fixed table; tracks how many lookups overlap.
    #[derive(Clone)]
    pub struct TableResolver {
        state: Arc<TableState>,
    }

    struct TableState {
        known: HashMap<String, usize>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl TableResolver {
        pub fn new(known: &[&str], delay: Duration) -> Self {
            Self {
                state: Arc::new(TableState {
                    known: known.iter().map(|d| (d.to_string(), 1)).collect(),
                    delay,
                    in_flight: AtomicUsize::new(0),
                    peak: AtomicUsize::new(0),
                    seen: Mutex::new(Vec::new()),
                }),
            }
        }

        /// Highest number of lookups observed in flight at once.
        pub fn peak(&self) -> usize {
            self.state.peak.load(Ordering::SeqCst)
        }

        /// Every name looked up, in call order.
        pub fn seen(&self) -> Vec<String> {
            self.state.seen.lock().unwrap().clone()
        }
    }

    impl Resolve for TableResolver {
        fn lookup(&self, name: &str) -> Lookup {
            let state = Arc::clone(&self.state);
            let name = name.to_string();
            Box::pin(async move {
                let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                state.peak.fetch_max(now, Ordering::SeqCst);
                state.seen.lock().unwrap().push(name.clone());
                tokio::time::sleep(state.delay).await;
                state.in_flight.fetch_sub(1, Ordering::SeqCst);
                state.known.get(&name).copied().ok_or(ErrorKind::NotFound)
            })
        }
    }
}
