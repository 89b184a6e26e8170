//! Bounded worker pool for one job.
//!
//! [`run`] spawns a fixed number of workers over a shared,
//! order-preserving unit queue. Each worker executes one unit's opaque
//! task, reports the outcome, then pulls the next unit. A unit failure
//! is normal: it is counted, never fatal to sibling workers.
//! Cancellation is cooperative: observed between pulls, with in-flight
//! units allowed to finish.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Work units
// ---------------------------------------------------------------------------

type UnitTask = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<serde_json::Value>> + Send>;

/// One opaque unit of work: a label plus a caller-supplied task.
/// Immutable once enqueued.
pub struct WorkUnit {
    label: String,
    task: UnitTask,
}

impl WorkUnit {
    /// Wrap a task future. The task runs exactly once, on one worker.
    pub fn new<F, Fut>(label: impl Into<String>, task: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            label: label.into(),
            task: Box::new(move || Box::pin(task())),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkUnit").field("label", &self.label).finish()
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of a single executed unit, handed to the report sink.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub label: String,
    pub success: bool,
    /// Task-provided result payload on success.
    pub detail: Option<serde_json::Value>,
    /// Stringified task error on failure.
    pub error: Option<String>,
}

/// Aggregate outcome of one pool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// `true` when a cancellation request was observed during the run.
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Execute `units` with at most `concurrency` workers.
///
/// - `concurrency` is clamped to `[1, units.len()]`.
/// - With one worker, units run in submission order.
/// - Each unit is pulled under the queue lock, so it executes exactly
///   once regardless of completion order.
/// - `on_report` is invoked once per executed unit, after the task
///   finished and before the worker pulls again.
pub async fn run<F>(
    units: Vec<WorkUnit>,
    concurrency: usize,
    cancel: CancellationToken,
    on_report: F,
) -> PoolSummary
where
    F: Fn(UnitReport) + Send + Sync + 'static,
{
    let worker_count = concurrency.clamp(1, units.len().max(1));
    let queue = Arc::new(Mutex::new(VecDeque::from(units)));
    let tallies = Arc::new(Tallies::default());
    let on_report = Arc::new(on_report);

    let mut workers = JoinSet::new();
    for worker in 0..worker_count {
        let queue = Arc::clone(&queue);
        let tallies = Arc::clone(&tallies);
        let on_report = Arc::clone(&on_report);
        let cancel = cancel.clone();

        workers.spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    tracing::debug!(worker, "Worker observed cancellation, stopping");
                    break;
                }

                let unit = {
                    let mut queue = queue.lock().expect("unit queue poisoned");
                    queue.pop_front()
                };
                let Some(unit) = unit else { break };

                // The task is an opaque external call; no lock is held
                // across this await.
                let label = unit.label;
                let report = match (unit.task)().await {
                    Ok(detail) => {
                        tallies.succeeded.fetch_add(1, Ordering::Relaxed);
                        UnitReport {
                            label,
                            success: true,
                            detail: Some(detail),
                            error: None,
                        }
                    }
                    Err(e) => {
                        tallies.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(error = %e, "Unit task failed");
                        UnitReport {
                            label,
                            success: false,
                            detail: None,
                            error: Some(e.to_string()),
                        }
                    }
                };
                tallies.processed.fetch_add(1, Ordering::Relaxed);
                on_report(report);
            }
        });
    }

    while workers.join_next().await.is_some() {}

    PoolSummary {
        processed: tallies.processed.load(Ordering::Relaxed),
        succeeded: tallies.succeeded.load(Ordering::Relaxed),
        failed: tallies.failed.load(Ordering::Relaxed),
        cancelled: cancel.is_cancelled(),
    }
}

#[derive(Debug, Default)]
struct Tallies {
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
