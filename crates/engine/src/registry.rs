//! Process-wide job registry.
//!
//! The registry owns the authoritative [`Job`] records, allocates ids,
//! and runs each job as an independent tokio task. It deliberately does
//! not bound the number of simultaneously running jobs; each job only
//! bounds its own worker concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::event::{EventBus, JobEvent};
use crate::job::{Job, JobId, JobKind, JobSnapshot, JobStatus, Transition};
use crate::pool::{self, WorkUnit};

/// Upper bound for per-job worker concurrency.
pub const MAX_CONCURRENCY: usize = 10;

/// Worker concurrency used when the caller does not ask for one.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Errors returned by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Job not found: {0}")]
    NotFound(JobId),
}

// ---------------------------------------------------------------------------
// Unit sources
// ---------------------------------------------------------------------------

/// Caller-supplied producer of a job's unit list.
///
/// Materialization happens on the job's own task, after creation has
/// already returned. A materialization error is a job-level fatal error:
/// the job transitions straight to `Failed` and no units run.
#[async_trait]
pub trait UnitSource: Send + 'static {
    async fn materialize(self: Box<Self>) -> anyhow::Result<Vec<WorkUnit>>;
}

/// A pre-built unit list. Mostly useful in tests and for callers that
/// already have their units in hand.
pub struct StaticUnits(pub Vec<WorkUnit>);

#[async_trait]
impl UnitSource for StaticUnits {
    async fn materialize(self: Box<Self>) -> anyhow::Result<Vec<WorkUnit>> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Thread-safe table of all known jobs.
///
/// Constructed once at process start and shared via `Arc`; tests build a
/// fresh registry per case instead of relying on ambient global state.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
    next_id: AtomicI64,
    bus: Arc<EventBus>,
}

impl JobRegistry {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            bus,
        }
    }

    /// The bus this registry publishes job events to.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Create a job and start it asynchronously.
    ///
    /// Returns immediately with the id of a `Pending` job; the unit
    /// source is materialized on the job's own task. `concurrency` is
    /// clamped to `[1, MAX_CONCURRENCY]`.
    pub fn create(
        self: &Arc<Self>,
        kind: JobKind,
        label: impl Into<String>,
        concurrency: usize,
        source: Box<dyn UnitSource>,
    ) -> JobId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        let job = Arc::new(Job::new(id, kind, label, concurrency));

        self.bus.open(id);
        self.jobs
            .write()
            .expect("registry lock poisoned")
            .insert(id, Arc::clone(&job));

        tracing::info!(job_id = id, kind = %kind, concurrency, "Job created");

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            registry.run_job(job, source).await;
        });

        id
    }

    /// Snapshot a single job.
    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .expect("registry lock poisoned")
            .get(&id)
            .map(|job| job.snapshot())
    }

    /// Snapshot all jobs, optionally filtered by kind, newest first.
    pub fn list(&self, kind: Option<JobKind>) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<_> = self
            .jobs
            .read()
            .expect("registry lock poisoned")
            .values()
            .filter(|job| kind.map_or(true, |k| job.kind() == k))
            .map(|job| job.snapshot())
            .collect();
        snapshots.sort_by(|a, b| b.id.cmp(&a.id));
        snapshots
    }

    /// Signal cancellation and return the current snapshot.
    ///
    /// Cancellation is cooperative: in-flight units finish, so the
    /// returned snapshot usually still reads `running`. Cancelling a job
    /// that already reached a terminal state is a successful no-op
    /// returning that terminal snapshot.
    pub fn cancel(&self, id: JobId) -> Result<JobSnapshot, RegistryError> {
        let job = self
            .jobs
            .read()
            .expect("registry lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))?;

        let snapshot = job.snapshot();
        if !snapshot.status.is_terminal() {
            tracing::info!(job_id = id, "Job cancellation requested");
            job.cancel_token().cancel();
        }
        Ok(snapshot)
    }

    /// Drive one job from materialization to its terminal state.
    async fn run_job(&self, job: Arc<Job>, source: Box<dyn UnitSource>) {
        if job.cancel_token().is_cancelled() {
            self.finish(&job, JobStatus::Cancelled, None);
            return;
        }

        let units = match source.materialize().await {
            Ok(units) => units,
            Err(e) => {
                tracing::error!(job_id = job.id(), error = %e, "Failed to materialize work units");
                self.finish(&job, JobStatus::Failed, Some(e.to_string()));
                return;
            }
        };

        job.set_total_units(units.len() as u64);
        let Some(snapshot) = job.begin_running() else {
            // Finished before it started (cancelled during creation).
            return;
        };
        self.bus.publish(JobEvent::status(&snapshot));
        tracing::info!(
            job_id = job.id(),
            total_units = snapshot.total_units,
            "Job running",
        );

        let sink_job = Arc::clone(&job);
        let sink_bus = Arc::clone(&self.bus);
        let summary = pool::run(
            units,
            job.requested_concurrency(),
            job.cancel_token(),
            move |report| {
                // One result event, then the progress event reflecting it.
                sink_bus.publish(JobEvent::result(sink_job.id(), &report));
                let snapshot = sink_job.record_unit(&report);
                sink_bus.publish(JobEvent::progress(&snapshot));
            },
        )
        .await;

        let status = if summary.cancelled {
            JobStatus::Cancelled
        } else {
            JobStatus::Completed
        };
        self.finish(&job, status, None);
    }

    /// Apply the terminal transition and publish the terminal event.
    fn finish(&self, job: &Arc<Job>, status: JobStatus, error: Option<String>) {
        match job.try_finish(status, error) {
            Transition::Applied(snapshot) => {
                tracing::info!(
                    job_id = snapshot.id,
                    status = %snapshot.status,
                    processed = snapshot.processed,
                    succeeded = snapshot.succeeded,
                    failed = snapshot.failed,
                    "Job finished",
                );
                self.bus.publish_terminal(JobEvent::status(&snapshot));
            }
            Transition::AlreadyTerminal(_) => {}
        }
    }
}
