//! Per-job progress event bus.
//!
//! [`EventBus`] fans job events out to any number of live subscribers.
//! Delivery rules:
//!
//! - Each subscriber has its own bounded buffer; a full buffer drops the
//!   oldest undelivered event so a slow consumer never blocks a worker.
//! - The terminal `status` event is exempt from dropping -- it is the
//!   signal a subscriber relies on to stop listening, so it is always
//!   appended and the stream is closed after it.
//! - Subscribing after the job finished yields the recorded terminal
//!   event immediately, then the stream ends.
//!
//! Publishing is always non-blocking; the bus shares no buffer between
//! subscribers, so one slow consumer cannot stall another.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::Notify;

use crate::job::{JobId, JobSnapshot, JobStatus};
use crate::pool::UnitReport;

/// Default per-subscriber buffer capacity.
pub const EVENT_BUFFER_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A single progress event for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Event body. The serialized `type` tag matches the WebSocket wire
/// format consumed by the frontend.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventPayload {
    /// Counter update after a unit finished.
    Progress {
        processed: u64,
        succeeded: u64,
        failed: u64,
        total_units: u64,
    },
    /// Outcome of the last finished unit.
    Result {
        label: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A status transition; `error` is set for failed jobs.
    Status {
        status: JobStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl JobEvent {
    /// Build a `progress` event from a counter snapshot.
    pub fn progress(snap: &JobSnapshot) -> Self {
        Self {
            job_id: snap.id,
            payload: EventPayload::Progress {
                processed: snap.processed,
                succeeded: snap.succeeded,
                failed: snap.failed,
                total_units: snap.total_units,
            },
        }
    }

    /// Build a `result` event from a unit report.
    pub fn result(job_id: JobId, report: &UnitReport) -> Self {
        Self {
            job_id,
            payload: EventPayload::Result {
                label: report.label.clone(),
                success: report.success,
                detail: report.detail.clone(),
                error: report.error.clone(),
            },
        }
    }

    /// Build a `status` event from a snapshot.
    pub fn status(snap: &JobSnapshot) -> Self {
        Self {
            job_id: snap.id,
            payload: EventPayload::Status {
                status: snap.status,
                error: snap.error_message.clone(),
            },
        }
    }

    fn is_terminal_status(&self) -> bool {
        matches!(self.payload, EventPayload::Status { status, .. } if status.is_terminal())
    }
}

// ---------------------------------------------------------------------------
// Subscriber plumbing
// ---------------------------------------------------------------------------

/// Shared state between the bus and one [`EventStream`].
#[derive(Debug)]
struct SubscriberInner {
    queue: Mutex<VecDeque<JobEvent>>,
    /// Set once the terminal event has been enqueued; no further events
    /// will arrive after this flips.
    finished: AtomicBool,
    notify: Notify,
}

impl SubscriberInner {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            finished: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Append an event, dropping the oldest buffered one when the buffer
    /// is full and the event is droppable.
    fn push(&self, event: JobEvent, capacity: usize, droppable: bool) {
        {
            let mut queue = self.queue.lock().expect("subscriber queue poisoned");
            if droppable && queue.len() >= capacity {
                queue.pop_front();
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// Receiving half of a subscription. Dropping the stream unsubscribes.
#[derive(Debug)]
pub struct EventStream {
    inner: Arc<SubscriberInner>,
}

impl EventStream {
    /// Receive the next event. Returns `None` once the terminal event has
    /// been consumed (or the job's topic was closed before any event).
    pub async fn recv(&mut self) -> Option<JobEvent> {
        loop {
            let notified = self.inner.notify.notified();
            {
                let mut queue = self.inner.queue.lock().expect("subscriber queue poisoned");
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.inner.finished.load(Ordering::Acquire) {
                    return None;
                }
            }
            notified.await;
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Per-job topic state.
#[derive(Debug, Default)]
struct Topic {
    subscribers: Vec<Arc<SubscriberInner>>,
    /// Recorded terminal event, replayed to late subscribers.
    terminal: Option<JobEvent>,
}

/// In-process fan-out bus keyed by job id.
///
/// Designed to be shared via `Arc<EventBus>` between the registry (the
/// only publisher) and transport-layer subscribers.
#[derive(Debug)]
pub struct EventBus {
    topics: Mutex<HashMap<JobId, Topic>>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus with a specific per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, Topic>> {
        self.topics.lock().expect("event bus mutex poisoned")
    }

    /// Register a topic for a new job. Called by the registry at job
    /// creation so subscribers can attach before the first event.
    pub fn open(&self, job_id: JobId) {
        self.locked().entry(job_id).or_default();
    }

    /// Publish a non-terminal event to all current subscribers of the
    /// job. Never blocks: full subscriber buffers drop their oldest
    /// event. Events for unknown jobs are discarded.
    pub fn publish(&self, event: JobEvent) {
        let mut topics = self.locked();
        let Some(topic) = topics.get_mut(&event.job_id) else {
            return;
        };
        // Prune subscribers whose stream half has been dropped.
        topic.subscribers.retain(|sub| Arc::strong_count(sub) > 1);
        for sub in &topic.subscribers {
            sub.push(event.clone(), self.capacity, true);
        }
    }

    /// Publish the terminal status event and close the topic.
    ///
    /// The terminal event is never dropped: it is appended to every
    /// subscriber regardless of buffer occupancy (appending to an
    /// in-memory queue never blocks the producer), recorded for late
    /// subscribers, and each stream ends after delivering it.
    pub fn publish_terminal(&self, event: JobEvent) {
        debug_assert!(event.is_terminal_status());
        let mut topics = self.locked();
        let Some(topic) = topics.get_mut(&event.job_id) else {
            return;
        };
        topic.terminal = Some(event.clone());
        for sub in topic.subscribers.drain(..) {
            sub.push(event.clone(), self.capacity, false);
            sub.finish();
        }
    }

    /// Subscribe to a job's events. Returns `None` for unknown job ids.
    ///
    /// Subscribers receive every event published after they attach, with no
    /// history replay. If the job already finished, the stream yields
    /// the recorded terminal event and then ends.
    pub fn subscribe(&self, job_id: JobId) -> Option<EventStream> {
        let mut topics = self.locked();
        let topic = topics.get_mut(&job_id)?;
        let inner = Arc::new(SubscriberInner::new());

        if let Some(terminal) = &topic.terminal {
            inner.push(terminal.clone(), self.capacity, false);
            inner.finish();
        } else {
            topic.subscribers.push(Arc::clone(&inner));
        }

        Some(EventStream { inner })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUFFER_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;

    fn progress_event(job_id: JobId, processed: u64) -> JobEvent {
        JobEvent {
            job_id,
            payload: EventPayload::Progress {
                processed,
                succeeded: processed,
                failed: 0,
                total_units: 100,
            },
        }
    }

    fn terminal_event(job_id: JobId, status: JobStatus) -> JobEvent {
        JobEvent {
            job_id,
            payload: EventPayload::Status {
                status,
                error: None,
            },
        }
    }

    fn processed_of(event: &JobEvent) -> u64 {
        match event.payload {
            EventPayload::Progress { processed, .. } => processed,
            _ => panic!("expected progress event"),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_events_in_order() {
        let bus = EventBus::default();
        bus.open(1);
        let mut stream = bus.subscribe(1).expect("topic exists");

        bus.publish(progress_event(1, 1));
        bus.publish(progress_event(1, 2));

        assert_eq!(processed_of(&stream.recv().await.expect("first")), 1);
        assert_eq!(processed_of(&stream.recv().await.expect("second")), 2);
    }

    #[tokio::test]
    async fn full_buffer_drops_oldest_event() {
        let bus = EventBus::new(2);
        bus.open(1);
        let mut stream = bus.subscribe(1).expect("topic exists");

        bus.publish(progress_event(1, 1));
        bus.publish(progress_event(1, 2));
        bus.publish(progress_event(1, 3)); // evicts event 1

        assert_eq!(processed_of(&stream.recv().await.expect("event")), 2);
        assert_eq!(processed_of(&stream.recv().await.expect("event")), 3);
    }

    #[tokio::test]
    async fn terminal_event_survives_full_buffer_and_closes_stream() {
        let bus = EventBus::new(1);
        bus.open(1);
        let mut stream = bus.subscribe(1).expect("topic exists");

        bus.publish(progress_event(1, 1));
        bus.publish_terminal(terminal_event(1, JobStatus::Completed));

        // Progress may have been evicted, but the terminal event is
        // always the last one delivered.
        let mut last = stream.recv().await.expect("at least the terminal event");
        while let Some(event) = stream.recv().await {
            last = event;
        }
        assert!(matches!(
            last.payload,
            EventPayload::Status {
                status: JobStatus::Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn subscribe_after_terminal_yields_terminal_and_ends() {
        let bus = EventBus::default();
        bus.open(7);
        bus.publish_terminal(terminal_event(7, JobStatus::Cancelled));

        let mut stream = bus.subscribe(7).expect("topic retained");
        let event = stream.recv().await.expect("terminal event replayed");
        assert!(matches!(
            event.payload,
            EventPayload::Status {
                status: JobStatus::Cancelled,
                ..
            }
        ));
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn subscribe_unknown_job_returns_none() {
        let bus = EventBus::default();
        assert!(bus.subscribe(999).is_none());
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_every_event() {
        let bus = EventBus::default();
        bus.open(1);
        let mut a = bus.subscribe(1).expect("topic exists");
        let mut b = bus.subscribe(1).expect("topic exists");

        bus.publish(progress_event(1, 5));

        assert_eq!(processed_of(&a.recv().await.expect("a")), 5);
        assert_eq!(processed_of(&b.recv().await.expect("b")), 5);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_on_publish() {
        let bus = EventBus::default();
        bus.open(1);
        let stream = bus.subscribe(1).expect("topic exists");
        drop(stream);

        // Publishing must not retain the dead subscriber.
        bus.publish(progress_event(1, 1));
        let topics = bus.locked();
        assert!(topics.get(&1).expect("topic").subscribers.is_empty());
    }

    #[tokio::test]
    async fn events_serialize_with_lowercase_type_tags() {
        let job = crate::job::Job::new(3, JobKind::Enrich, "batch", 2);
        let snap = job.snapshot();

        let progress = serde_json::to_value(JobEvent::progress(&snap)).expect("serialize");
        assert_eq!(progress["type"], "progress");
        assert_eq!(progress["job_id"], 3);

        let status = serde_json::to_value(JobEvent::status(&snap)).expect("serialize");
        assert_eq!(status["type"], "status");
        assert_eq!(status["status"], "pending");
    }
}
