//! Bounded-concurrency worker pool.
//!
//! A fixed number of tokio tasks pull [`DomainTask`]s from one shared queue
//! until it is empty. Each worker holds at most one lookup in flight, so the
//! worker count is the concurrency cap. Outcomes are funnelled through a
//! single channel to the collector, which is the only place that appends to
//! the outcome list and the only caller of the progress reporter.

use crate::error::DomainResolveError;
use crate::resolver::Resolve;
use crate::retry::{resolve_with_retry, RetryPolicy};
use crate::types::{DomainTask, ResolutionOutcome, MAX_WORKERS, MIN_WORKERS};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Read-only observer of run progress.
pub trait ProgressReporter: Send + Sync {
    /// Called with `(0, total)` before the first outcome and after every
    /// outcome thereafter.
    fn report(&self, completed: usize, total: usize);
}

/// Progress reporter that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _completed: usize, _total: usize) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn report(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

type SharedQueue = Arc<Mutex<VecDeque<DomainTask>>>;

/// Dispatches tasks to a fixed number of concurrent workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` concurrent slots, clamped to 1-200.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.clamp(MIN_WORKERS, MAX_WORKERS),
        }
    }

    /// The concurrency cap.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolve every task and return exactly one outcome per task.
    ///
    /// Tasks are dequeued in input order; outcomes arrive in completion
    /// order. Per-domain failures are recorded in the outcomes. Only a pool
    /// that cannot run (no tokio runtime, a lost worker, missing outcomes)
    /// returns an error.
    pub async fn run(
        &self,
        resolver: Arc<dyn Resolve>,
        tasks: Vec<DomainTask>,
        timeout: Duration,
        policy: RetryPolicy,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ResolutionOutcome>, DomainResolveError> {
        let total = tasks.len();
        progress.report(0, total);
        if total == 0 {
            return Ok(Vec::new());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DomainResolveError::run(format!("no async runtime available: {}", e)))?;

        let queue: SharedQueue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker_count = self.workers.min(total);

        tracing::debug!(workers = worker_count, tasks = total, "starting worker pool");

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn_on(
                worker_loop(
                    id,
                    Arc::clone(&queue),
                    tx.clone(),
                    Arc::clone(&resolver),
                    timeout,
                    policy,
                ),
                &runtime,
            );
        }
        // The channel closes once every worker has dropped its sender.
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
            progress.report(outcomes.len(), total);
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| DomainResolveError::run(format!("worker failed: {}", e)))?;
        }

        if outcomes.len() != total {
            return Err(DomainResolveError::run(format!(
                "expected {} outcomes, collected {}",
                total,
                outcomes.len()
            )));
        }

        Ok(outcomes)
    }
}

async fn worker_loop(
    id: usize,
    queue: SharedQueue,
    tx: mpsc::UnboundedSender<ResolutionOutcome>,
    resolver: Arc<dyn Resolve>,
    timeout: Duration,
    policy: RetryPolicy,
) {
    let mut handled = 0usize;

    loop {
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(task) = next else {
            break;
        };

        let outcome = resolve_with_retry(resolver.as_ref(), &task.normalized, timeout, &policy).await;
        if tx.send(outcome).is_err() {
            // Collector is gone; nobody is waiting for more work.
            break;
        }
        handled += 1;
    }

    tracing::trace!(worker = id, handled, "worker drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resolver::testing::{ScriptedResolver, TableResolver};
    use crate::resolver::Lookup;
    use crate::retry::Backoff;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tasks(n: usize) -> Vec<DomainTask> {
        (0..n)
            .map(|i| DomainTask::new(format!("host{}.test", i), format!("host{}.test", i)))
            .collect()
    }

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Backoff::none())
    }

    #[tokio::test]
    async fn test_one_outcome_per_task_for_any_worker_count() {
        for workers in [1, 2, 7, 50, 200] {
            let resolver = Arc::new(ScriptedResolver::always(Ok(1)));
            let pool = WorkerPool::new(workers);

            let outcomes = pool
                .run(resolver, tasks(37), Duration::from_secs(1), policy(0), &NoProgress)
                .await
                .unwrap();

            assert_eq!(outcomes.len(), 37, "workers = {}", workers);
            let unique: HashSet<_> = outcomes.iter().map(|o| o.domain.clone()).collect();
            assert_eq!(unique.len(), 37);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_cap() {
        let resolver = TableResolver::new(&[], Duration::from_millis(5));
        let pool = WorkerPool::new(3);

        let outcomes = pool
            .run(
                Arc::new(resolver.clone()),
                tasks(24),
                Duration::from_secs(5),
                policy(1),
                &NoProgress,
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 24);
        assert!(outcomes.iter().all(|o| o.attempts == 2));
        assert!(resolver.peak() <= 3, "peak was {}", resolver.peak());
        assert!(resolver.peak() >= 1);
    }

    #[tokio::test]
    async fn test_single_worker_admits_in_input_order() {
        let resolver = TableResolver::new(&[], Duration::ZERO);
        let pool = WorkerPool::new(1);

        pool.run(
            Arc::new(resolver.clone()),
            tasks(5),
            Duration::from_secs(1),
            policy(0),
            &NoProgress,
        )
        .await
        .unwrap();

        let expected: Vec<String> = (0..5).map(|i| format!("host{}.test", i)).collect();
        assert_eq!(resolver.seen(), expected);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let reports = AtomicUsize::new(0);
        let progress = |completed: usize, total: usize| {
            assert_eq!((completed, total), (0, 0));
            reports.fetch_add(1, Ordering::SeqCst);
        };

        let outcomes = WorkerPool::new(10)
            .run(
                Arc::new(ScriptedResolver::always(Ok(1))),
                Vec::new(),
                Duration::from_secs(1),
                policy(0),
                &progress,
            )
            .await
            .unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(reports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_progress_counts_up_to_total() {
        let seen = Mutex::new(Vec::new());
        let progress = |completed: usize, total: usize| {
            seen.lock().unwrap().push((completed, total));
        };

        WorkerPool::new(4)
            .run(
                Arc::new(ScriptedResolver::always(Ok(1))),
                tasks(10),
                Duration::from_secs(1),
                policy(0),
                &progress,
            )
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        let expected: Vec<(usize, usize)> = (0..=10).map(|i| (i, 10)).collect();
        assert_eq!(seen, expected);
    }

    struct PanicsOn(&'static str);

    impl Resolve for PanicsOn {
        fn lookup(&self, name: &str) -> Lookup {
            let poisoned = name == self.0;
            Box::pin(async move {
                if poisoned {
                    panic!("resolver bug");
                }
                Ok(1)
            })
        }
    }

    #[tokio::test]
    async fn test_panicking_lookup_is_isolated() {
        let mut input = tasks(6);
        input.push(DomainTask::new("boom.test", "boom.test"));

        let outcomes = WorkerPool::new(2)
            .run(
                Arc::new(PanicsOn("boom.test")),
                input,
                Duration::from_secs(1),
                policy(1),
                &NoProgress,
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 7);
        let boom = outcomes.iter().find(|o| o.domain == "boom.test").unwrap();
        assert!(!boom.resolved);
        assert_eq!(boom.attempts, 2);
        assert_eq!(boom.last_error, Some(ErrorKind::Internal));
        assert_eq!(outcomes.iter().filter(|o| o.resolved).count(), 6);
    }

    /// Panics in `lookup` itself, before any future exists.
    struct PanicsBeforeFuture(&'static str);

    impl Resolve for PanicsBeforeFuture {
        fn lookup(&self, name: &str) -> Lookup {
            if name == self.0 {
                panic!("lookup could not start");
            }
            Box::pin(async { Ok(1) })
        }
    }

    #[tokio::test]
    async fn test_lookup_panicking_before_future_is_isolated() {
        let mut input = tasks(3);
        input.push(DomainTask::new("boom.test", "boom.test"));

        let outcomes = WorkerPool::new(2)
            .run(
                Arc::new(PanicsBeforeFuture("boom.test")),
                input,
                Duration::from_secs(1),
                policy(0),
                &NoProgress,
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 4);
        let boom = outcomes.iter().find(|o| o.domain == "boom.test").unwrap();
        assert!(!boom.resolved);
        assert_eq!(boom.attempts, 1);
        assert_eq!(boom.last_error, Some(ErrorKind::Internal));
        assert_eq!(outcomes.iter().filter(|o| o.resolved).count(), 3);
    }

    #[test]
    fn test_worker_count_is_clamped() {
        assert_eq!(WorkerPool::new(0).workers(), 1);
        assert_eq!(WorkerPool::new(1000).workers(), 200);
    }
}
