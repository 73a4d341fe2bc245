use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};

/// Outcome of one task, tagged with the task's position in the input.
#[derive(Debug)]
pub struct TaskResult<R> {
    pub index: usize,
    pub outcome: Result<R>,
}

/// A task that failed and was excluded from the aggregated result.
#[derive(Debug)]
pub struct TaskFailure {
    pub index: usize,
    pub error: Error,
}

/// Aggregated results of a parallel pass.
#[derive(Debug)]
pub struct TaskResults<R> {
    /// Successful results, in task order.
    pub completed: Vec<R>,
    pub failed: Vec<TaskFailure>,
}

/// Farms independent, stateless tasks out to a fixed pool of worker threads.
///
/// Tasks only receive shared references to their input, so nothing crossing the
/// worker boundary can be mutated. Every dispatched task runs to completion; a
/// task that errors or panics is reported on its own without affecting siblings.
pub struct ParallelExecutor {
    pool: ThreadPool,
}

impl ParallelExecutor {
    /// Build an executor with `workers` threads, or one per available core if `None` (or zero).
    pub fn new(workers: Option<usize>) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.unwrap_or(0))
            .thread_name(|i| format!("sectorgrid-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    #[inline] pub fn workers(&self) -> usize { self.pool.current_num_threads() }

    /// Apply `task_fn` to every task in parallel and return one result per task, in task order.
    pub fn map<T, R, F>(&self, tasks: &[T], task_fn: F) -> Vec<TaskResult<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync,
    {
        self.pool.install(|| {
            tasks.par_iter()
                .enumerate()
                .map(|(index, task)| {
                    let outcome = catch_unwind(AssertUnwindSafe(|| task_fn(task)))
                        .unwrap_or_else(|panic| Err(Error::GeometryOp(format!("task panicked: {}", panic_message(&*panic)))));
                    TaskResult { index, outcome }
                })
                .collect()
        })
    }

    /// Like [`ParallelExecutor::map`], but splits successes from failures and logs the failures.
    pub fn map_partitioned<T, R, F>(&self, stage: &str, tasks: &[T], task_fn: F) -> TaskResults<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync,
    {
        let mut completed = Vec::with_capacity(tasks.len());
        let mut failed = Vec::new();

        for TaskResult { index, outcome } in self.map(tasks, task_fn) {
            match outcome {
                Ok(result) => completed.push(result),
                Err(error) => {
                    tracing::debug!(stage, task = index, error = %error, "task failed");
                    failed.push(TaskFailure { index, error });
                }
            }
        }

        if !failed.is_empty() {
            tracing::warn!(stage, failed = failed.len(), total = tasks.len(), "excluded failed tasks");
        }

        TaskResults { completed, failed }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() { return s.to_string() }
    if let Some(s) = panic.downcast_ref::<String>() { return s.clone() }
    "unknown panic payload".into()
}
