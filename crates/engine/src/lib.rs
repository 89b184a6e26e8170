//! Background job orchestration engine.
//!
//! The engine coordinates long-lived, cancellable jobs built from opaque
//! units of work. It knows nothing about scraping, enrichment, or
//! persistence: callers hand it a [`UnitSource`] and it reports outcomes.
//!
//! Building blocks:
//!
//! - [`Job`] — a state machine with mutex-guarded counters and an
//!   exactly-once terminal transition.
//! - [`pool`] — a bounded worker pool that drains a shared unit queue
//!   with cooperative cancellation.
//! - [`EventBus`] — per-job publish/subscribe with bounded, lossy
//!   delivery for progress events and guaranteed delivery of the
//!   terminal status event.
//! - [`JobRegistry`] — the process-wide job table: create, snapshot,
//!   list, cancel.

pub mod event;
pub mod job;
pub mod pool;
pub mod registry;

pub use event::{EventBus, EventPayload, EventStream, JobEvent};
pub use job::{Job, JobId, JobKind, JobSnapshot, JobStatus, Transition};
pub use pool::{PoolSummary, UnitReport, WorkUnit};
pub use registry::{
    JobRegistry, RegistryError, StaticUnits, UnitSource, DEFAULT_CONCURRENCY, MAX_CONCURRENCY,
};
