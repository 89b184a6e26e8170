//! Job state machine and snapshot types.
//!
//! A [`Job`] wraps one worker-pool execution. Every mutable field lives
//! behind a single mutex; outside readers only ever receive
//! [`JobSnapshot`] copies, never a live reference.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::pool::UnitReport;

/// Job ids are monotonically assigned by the registry.
pub type JobId = i64;

// ---------------------------------------------------------------------------
// Kind / status enums
// ---------------------------------------------------------------------------

/// What a job does. Closed set: adding a kind requires touching every
/// exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Scrape,
    Enrich,
    Cleanup,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Enrich => "enrich",
            Self::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scrape" => Ok(Self::Scrape),
            "enrich" => Ok(Self::Enrich),
            "cleanup" => Ok(Self::Cleanup),
            other => Err(format!("Unknown job kind '{other}'")),
        }
    }
}

/// Lifecycle status. `Completed`, `Failed`, and `Cancelled` are terminal
/// and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Mutable job state. Only ever touched while holding the job mutex.
#[derive(Debug)]
struct JobInner {
    status: JobStatus,
    total_units: u64,
    processed: u64,
    succeeded: u64,
    failed: u64,
    current_label: Option<String>,
    error_message: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

/// One background job. Owned by the registry as `Arc<Job>`; the worker
/// pool reports into it through the registry's sink, never owning it.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    kind: JobKind,
    label: String,
    requested_concurrency: usize,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
    inner: Mutex<JobInner>,
}

/// Outcome of a terminal-transition attempt.
#[derive(Debug)]
pub enum Transition {
    /// The transition was applied; the snapshot reflects the new state.
    Applied(JobSnapshot),
    /// The job was already terminal; the snapshot is the existing state.
    AlreadyTerminal(JobSnapshot),
}

impl Transition {
    pub fn snapshot(&self) -> &JobSnapshot {
        match self {
            Self::Applied(snap) | Self::AlreadyTerminal(snap) => snap,
        }
    }
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        kind: JobKind,
        label: impl Into<String>,
        requested_concurrency: usize,
    ) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            requested_concurrency,
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
            inner: Mutex::new(JobInner {
                status: JobStatus::Pending,
                total_units: 0,
                processed: 0,
                succeeded: 0,
                failed: 0,
                current_label: None,
                error_message: None,
                completed_at: None,
            }),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn requested_concurrency(&self) -> usize {
        self.requested_concurrency
    }

    /// The token observed by the worker pool between unit pulls.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, JobInner> {
        self.inner.lock().expect("job mutex poisoned")
    }

    /// Copy out the current state. Readers never observe a torn update
    /// because every mutation happens under the same mutex.
    pub fn snapshot(&self) -> JobSnapshot {
        let inner = self.locked();
        JobSnapshot {
            id: self.id,
            kind: self.kind,
            label: self.label.clone(),
            status: inner.status,
            requested_concurrency: self.requested_concurrency,
            total_units: inner.total_units,
            processed: inner.processed,
            succeeded: inner.succeeded,
            failed: inner.failed,
            current_label: inner.current_label.clone(),
            error_message: inner.error_message.clone(),
            created_at: self.created_at,
            completed_at: inner.completed_at,
        }
    }

    /// Fix the unit count once the unit list has been materialized.
    pub(crate) fn set_total_units(&self, total: u64) {
        self.locked().total_units = total;
    }

    /// `Pending -> Running`. Returns the snapshot after the transition,
    /// or `None` if the job already left `Pending` (e.g. cancelled
    /// before start).
    pub(crate) fn begin_running(&self) -> Option<JobSnapshot> {
        {
            let mut inner = self.locked();
            if inner.status != JobStatus::Pending {
                return None;
            }
            inner.status = JobStatus::Running;
        }
        Some(self.snapshot())
    }

    /// Fold one unit outcome into the counters and return a consistent
    /// snapshot. `processed == succeeded + failed` holds at every
    /// observable point because the update is a single critical section.
    pub(crate) fn record_unit(&self, report: &UnitReport) -> JobSnapshot {
        {
            let mut inner = self.locked();
            inner.processed += 1;
            if report.success {
                inner.succeeded += 1;
            } else {
                inner.failed += 1;
            }
            inner.current_label = Some(report.label.clone());
        }
        self.snapshot()
    }

    /// Attempt the terminal transition. Exactly one attempt ever applies;
    /// later attempts are no-ops returning the existing terminal state.
    ///
    /// `error` is recorded only for `Failed`; failure details of other
    /// terminal states live in the per-unit counters.
    pub(crate) fn try_finish(&self, status: JobStatus, error: Option<String>) -> Transition {
        debug_assert!(status.is_terminal());
        {
            let mut inner = self.locked();
            if inner.status.is_terminal() {
                drop(inner);
                return Transition::AlreadyTerminal(self.snapshot());
            }
            inner.status = status;
            inner.completed_at = Some(Utc::now());
            if status == JobStatus::Failed {
                inner.error_message = error;
            }
        }
        Transition::Applied(self.snapshot())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time copy of a job's state, safe to hand to any reader.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub kind: JobKind,
    /// Human-readable description of the job (e.g. the searched location).
    pub label: String,
    pub status: JobStatus,
    pub requested_concurrency: usize,
    pub total_units: u64,
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Best-effort description of the in-flight unit; may be stale under
    /// high concurrency.
    pub current_label: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn report(label: &str, success: bool) -> UnitReport {
        UnitReport {
            label: label.to_string(),
            success,
            detail: None,
            error: if success { None } else { Some("boom".into()) },
        }
    }

    #[test]
    fn new_job_is_pending_with_zeroed_counters() {
        let job = Job::new(1, JobKind::Scrape, "Martinsburg, WV", 3);
        let snap = job.snapshot();

        assert_eq!(snap.status, JobStatus::Pending);
        assert_eq!(snap.processed, 0);
        assert_eq!(snap.total_units, 0);
        assert!(snap.completed_at.is_none());
    }

    #[test]
    fn record_unit_keeps_counter_invariant() {
        let job = Job::new(1, JobKind::Enrich, "batch", 3);
        job.record_unit(&report("a", true));
        job.record_unit(&report("b", false));
        let snap = job.record_unit(&report("c", true));

        assert_eq!(snap.processed, 3);
        assert_eq!(snap.succeeded, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.processed, snap.succeeded + snap.failed);
        assert_eq!(snap.current_label.as_deref(), Some("c"));
    }

    #[test]
    fn begin_running_only_from_pending() {
        let job = Job::new(1, JobKind::Scrape, "x", 1);
        assert!(job.begin_running().is_some());
        assert!(job.begin_running().is_none());
    }

    #[test]
    fn terminal_transition_applies_exactly_once() {
        let job = Job::new(1, JobKind::Scrape, "x", 1);
        job.begin_running();

        let first = job.try_finish(JobStatus::Completed, None);
        assert_matches!(first, Transition::Applied(_));
        let completed_at = first.snapshot().completed_at;
        assert!(completed_at.is_some());

        let second = job.try_finish(JobStatus::Cancelled, None);
        assert_matches!(second, Transition::AlreadyTerminal(_));
        assert_eq!(second.snapshot().status, JobStatus::Completed);
        // completed_at is never mutated a second time.
        assert_eq!(second.snapshot().completed_at, completed_at);
    }

    #[test]
    fn error_message_recorded_only_on_failure() {
        let job = Job::new(1, JobKind::Enrich, "x", 1);
        job.begin_running();
        let t = job.try_finish(JobStatus::Failed, Some("no units".into()));
        assert_eq!(t.snapshot().error_message.as_deref(), Some("no units"));

        let job = Job::new(2, JobKind::Enrich, "x", 1);
        job.begin_running();
        let t = job.try_finish(JobStatus::Cancelled, Some("ignored".into()));
        assert_eq!(t.snapshot().error_message, None);
    }

    #[test]
    fn cancel_before_start_finishes_from_pending() {
        let job = Job::new(1, JobKind::Cleanup, "x", 1);
        job.cancel_token().cancel();
        let t = job.try_finish(JobStatus::Cancelled, None);
        assert_matches!(t, Transition::Applied(_));
        assert_eq!(t.snapshot().status, JobStatus::Cancelled);
    }

    #[test]
    fn kind_parses_wire_names() {
        assert_eq!("scrape".parse::<JobKind>(), Ok(JobKind::Scrape));
        assert_eq!("enrich".parse::<JobKind>(), Ok(JobKind::Enrich));
        assert_eq!("cleanup".parse::<JobKind>(), Ok(JobKind::Cleanup));
        assert!("bake".parse::<JobKind>().is_err());
    }
}
