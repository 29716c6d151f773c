//! Bounded worker pool that executes a batch of graph-ready tasks
//! concurrently, respecting file claims and an optional conflict check.

use crate::claim::{FileClaim, FileClaimLedger};
use crate::config::AoTConfig;
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One task handed to the pool for execution.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Task id, matching the id used in the [`crate::graph::AoTGraph`].
    pub id: String,
    /// Paths this task will write, claimed exclusively for its duration.
    pub writes: Vec<PathBuf>,
    /// Paths this task will only read, claimed as shared reads —
    /// compatible with other tasks' reads, exclusive against writes.
    pub reads: Vec<PathBuf>,
}

impl TaskSpec {
    /// Create a task spec with no file claims.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            writes: Vec::new(),
            reads: Vec::new(),
        }
    }

    /// Attach paths this task will write.
    #[must_use]
    pub fn with_writes(mut self, writes: Vec<PathBuf>) -> Self {
        self.writes = writes;
        self
    }

    /// Attach paths this task will only read.
    #[must_use]
    pub fn with_reads(mut self, reads: Vec<PathBuf>) -> Self {
        self.reads = reads;
        self
    }

    fn claims(&self) -> Vec<FileClaim> {
        self.writes
            .iter()
            .cloned()
            .map(FileClaim::Write)
            .chain(self.reads.iter().cloned().map(FileClaim::Read))
            .collect()
    }
}

/// Result of one task's execution inside the pool.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    /// The task's closure returned successfully.
    Completed(T),
    /// The task's closure returned an error.
    Failed(String),
    /// The task exceeded [`AoTConfig::task_timeout`].
    TimedOut,
    /// The task could not be dispatched because a file it touches is
    /// already claimed by another running task.
    Blocked(String),
}

/// Pairwise conflict detection between two tasks beyond plain file-path
/// overlap (e.g. two tasks that touch different files but the same
/// exported symbol). Optional — callers without a static-analysis
/// backend simply never construct one.
#[async_trait]
pub trait ConflictChecker: Send + Sync {
    /// Whether running `a` and `b` concurrently would conflict.
    async fn conflicts(&self, a: &TaskSpec, b: &TaskSpec) -> bool;
}

/// Bounded pool of concurrent task executions.
///
/// Concurrency is capped by a `tokio::sync::Semaphore`; file safety is
/// enforced by a shared [`FileClaimLedger`]; a pluggable
/// [`ConflictChecker`] can additionally veto pairs the ledger wouldn't
/// catch on its own.
pub struct SubagentPool {
    ledger: FileClaimLedger,
    semaphore: Arc<Semaphore>,
    config: AoTConfig,
    conflict_checker: Option<Arc<dyn ConflictChecker>>,
}

impl SubagentPool {
    /// Create a pool bounded by `config.max_concurrency`.
    #[must_use]
    pub fn new(config: AoTConfig) -> Self {
        let permits = config.max_concurrency.max(1);
        Self {
            ledger: FileClaimLedger::new(),
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
            conflict_checker: None,
        }
    }

    /// Attach an optional conflict checker.
    #[must_use]
    pub fn with_conflict_checker(mut self, checker: Arc<dyn ConflictChecker>) -> Self {
        self.conflict_checker = Some(checker);
        self
    }

    /// The shared file-claim ledger, for callers that want to inspect
    /// currently-held claims.
    #[must_use]
    pub fn ledger(&self) -> &FileClaimLedger {
        &self.ledger
    }

    /// Pairwise-check `tasks` against the configured [`ConflictChecker`],
    /// if any. Returns id pairs flagged as conflicting. An empty result
    /// (including when no checker is configured) means "nothing to
    /// report" — it does not by itself block dispatch.
    pub async fn check_conflicts(&self, tasks: &[TaskSpec]) -> Vec<(String, String)> {
        let Some(checker) = &self.conflict_checker else {
            return Vec::new();
        };
        let mut conflicts = Vec::new();
        for i in 0..tasks.len() {
            for j in (i + 1)..tasks.len() {
                if checker.conflicts(&tasks[i], &tasks[j]).await {
                    conflicts.push((tasks[i].id.clone(), tasks[j].id.clone()));
                }
            }
        }
        conflicts
    }

    /// Execute every task in `tasks` concurrently, bounded by the pool's
    /// semaphore. For each task: acquire a permit, claim its files, run
    /// `spawn_fn(task)`, enforce the per-task timeout, then release the
    /// claim and permit regardless of outcome.
    ///
    /// A task whose files are already claimed is short-circuited to
    /// [`TaskOutcome::Blocked`] without ever calling `spawn_fn`.
    ///
    /// Results are returned in the same order as `tasks`.
    #[tracing::instrument(skip(self, tasks, spawn_fn), fields(batch_size = tasks.len()))]
    pub async fn execute_batch<F, Fut, T>(
        &self,
        tasks: Vec<TaskSpec>,
        spawn_fn: F,
    ) -> Vec<(String, TaskOutcome<T>)>
    where
        F: Fn(TaskSpec) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, String>> + Send + 'static,
        T: Send + 'static,
    {
        let spawn_fn = Arc::new(spawn_fn);
        let mut ids = Vec::with_capacity(tasks.len());
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            ids.push(task.id.clone());
            let id = task.id.clone();
            let claims = task.claims();
            let ledger = self.ledger.clone();
            let semaphore = Arc::clone(&self.semaphore);
            let spawn_fn = Arc::clone(&spawn_fn);
            let timeout = self.config.task_timeout.to_std();

            handles.push(tokio::spawn(async move {
                let permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("subagent pool semaphore never closes");
                let guard = match ledger.claim(&id, claims) {
                    Ok(g) => g,
                    Err(e) => return TaskOutcome::Blocked(e.to_string()),
                };
                let outcome = match tokio::time::timeout(timeout, spawn_fn(task)).await {
                    Ok(Ok(value)) => TaskOutcome::Completed(value),
                    Ok(Err(message)) => TaskOutcome::Failed(message),
                    Err(_) => TaskOutcome::TimedOut,
                };
                drop(guard);
                drop(permit);
                outcome
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in ids.into_iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => TaskOutcome::Failed(format!("task panicked: {e}")),
            };
            results.push((id, outcome));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_independent_tasks_concurrently() {
        let pool = SubagentPool::new(AoTConfig {
            max_concurrency: 4,
            ..AoTConfig::default()
        });
        let tasks = vec![TaskSpec::new("a"), TaskSpec::new("b"), TaskSpec::new("c")];
        let results = pool
            .execute_batch(tasks, |t| async move { Ok::<_, String>(t.id.clone()) })
            .await;
        assert_eq!(results.len(), 3);
        for (id, outcome) in results {
            match outcome {
                TaskOutcome::Completed(value) => assert_eq!(value, id),
                _ => panic!("expected completion"),
            }
        }
    }

    #[tokio::test]
    async fn concurrency_is_capped_by_semaphore() {
        let pool = SubagentPool::new(AoTConfig {
            max_concurrency: 2,
            ..AoTConfig::default()
        });
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let tasks = (0..6).map(|i| TaskSpec::new(format!("t{i}"))).collect();

        let active2 = Arc::clone(&active);
        let max_seen2 = Arc::clone(&max_seen);
        pool.execute_batch(tasks, move |_task| {
            let active = Arc::clone(&active2);
            let max_seen = Arc::clone(&max_seen2);
            async move {
                let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        })
        .await;

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn claimed_file_blocks_a_second_task() {
        let pool = SubagentPool::new(AoTConfig::default());
        let path = PathBuf::from("shared.rs");
        let _guard = pool
            .ledger()
            .claim("external-holder", vec![FileClaim::Write(path.clone())])
            .unwrap();

        let tasks = vec![TaskSpec::new("t").with_writes(vec![path])];
        let results = pool
            .execute_batch(tasks, |_t| async move { Ok::<_, String>(()) })
            .await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].1, TaskOutcome::Blocked(_)));
    }

    #[tokio::test]
    async fn failing_task_reports_failed_outcome() {
        let pool = SubagentPool::new(AoTConfig::default());
        let tasks = vec![TaskSpec::new("boom")];
        let results = pool
            .execute_batch(tasks, |_t| async move { Err::<(), _>("kaboom".to_string()) })
            .await;
        assert!(matches!(results[0].1, TaskOutcome::Failed(ref m) if m == "kaboom"));
    }

    #[tokio::test]
    async fn slow_task_times_out() {
        let pool = SubagentPool::new(AoTConfig {
            max_concurrency: 1,
            task_timeout: layer0::DurationMs::from_millis(10),
        });
        let tasks = vec![TaskSpec::new("slow")];
        let results = pool
            .execute_batch(tasks, |_t| async move {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                Ok::<_, String>(())
            })
            .await;
        assert!(matches!(results[0].1, TaskOutcome::TimedOut));
    }

    #[tokio::test]
    async fn timed_out_task_releases_its_claim() {
        let pool = SubagentPool::new(AoTConfig {
            max_concurrency: 1,
            task_timeout: layer0::DurationMs::from_millis(10),
        });
        let path = PathBuf::from("x.rs");
        let tasks = vec![TaskSpec::new("slow").with_writes(vec![path.clone()])];
        pool.execute_batch(tasks, |_t| async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok::<_, String>(())
        })
        .await;
        // give the sleeping task's drop a moment after the timeout fires
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        assert!(pool.ledger().is_empty());
    }

    #[tokio::test]
    async fn two_readers_of_the_same_file_both_run() {
        let pool = SubagentPool::new(AoTConfig {
            max_concurrency: 2,
            ..AoTConfig::default()
        });
        let path = PathBuf::from("shared.rs");
        let tasks = vec![
            TaskSpec::new("reader-a").with_reads(vec![path.clone()]),
            TaskSpec::new("reader-b").with_reads(vec![path]),
        ];
        let results = pool
            .execute_batch(tasks, |t| async move { Ok::<_, String>(t.id.clone()) })
            .await;
        assert_eq!(results.len(), 2);
        for (id, outcome) in results {
            match outcome {
                TaskOutcome::Completed(value) => assert_eq!(value, id),
                _ => panic!("expected both readers to complete, not block on each other"),
            }
        }
    }

    #[tokio::test]
    async fn a_reader_blocks_a_concurrent_writer_on_the_same_file() {
        let pool = SubagentPool::new(AoTConfig::default());
        let path = PathBuf::from("shared.rs");
        let _guard = pool
            .ledger()
            .claim("external-reader", vec![FileClaim::Read(path.clone())])
            .unwrap();

        let tasks = vec![TaskSpec::new("writer").with_writes(vec![path])];
        let results = pool
            .execute_batch(tasks, |_t| async move { Ok::<_, String>(()) })
            .await;
        assert!(matches!(results[0].1, TaskOutcome::Blocked(_)));
    }

    struct AlwaysConflict;

    #[async_trait]
    impl ConflictChecker for AlwaysConflict {
        async fn conflicts(&self, _a: &TaskSpec, _b: &TaskSpec) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn conflict_checker_flags_every_pair() {
        let pool = SubagentPool::new(AoTConfig::default())
            .with_conflict_checker(Arc::new(AlwaysConflict));
        let tasks = vec![TaskSpec::new("a"), TaskSpec::new("b"), TaskSpec::new("c")];
        let conflicts = pool.check_conflicts(&tasks).await;
        assert_eq!(conflicts.len(), 3);
    }

    #[tokio::test]
    async fn no_conflict_checker_reports_nothing() {
        let pool = SubagentPool::new(AoTConfig::default());
        let tasks = vec![TaskSpec::new("a"), TaskSpec::new("b")];
        assert!(pool.check_conflicts(&tasks).await.is_empty());
    }
}
